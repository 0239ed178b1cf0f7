//! Priors over the generation at which an allele originated.
//!
//! Origin-time postprocessors know only that an allele arose somewhere in a
//! half-open rank interval `[begin, end)`. A [Prior] weighs the candidate
//! generations in that interval:
//! * [Prior::interval_probability_proxy] - finite and non-negative, the
//!   interval's prior mass on the scale of a collision probability
//! * [Prior::interval_conditioned_mean] - expected generation, in `[begin, end)`
//! * [Prior::sample_interval_conditioned] - a draw restricted to the interval
//!
//! Implementations:
//! * [ArbitraryPrior] - constant proxy, midpoint mean
//! * [UniformPrior] - proxy proportional to interval width
//! * [ExponentialPrior] - continuous growth/decay with factor `f` per rank
//! * [GeometricPrior] - discrete counterpart of the exponential prior
//! * [BubbleWrapPrior] - decorator asserting the contract on every call
//!
//! Postprocessors hold priors as `Arc<dyn Prior>`, so one prior can be
//! shared by several pipeline stages.

mod arbitrary;
mod bubble_wrap;
mod exponential;
mod geometric;
mod uniform;

pub use self::arbitrary::ArbitraryPrior;
pub use self::bubble_wrap::BubbleWrapPrior;
pub use self::exponential::ExponentialPrior;
pub use self::geometric::GeometricPrior;
pub use self::uniform::UniformPrior;

use crate::error::{HstratError, Result};
use rand::RngCore;
use std::fmt;

/// Growth factors whose log is closer to zero than this are treated as 1.
pub(crate) const UNIT_GROWTH_EPSILON: f64 = 1e-9;

// =#========================================================================#=
// PRIOR (trait)
// =#========================================================================#=
/// Prior distribution over origin generations, queried per rank interval.
///
/// All methods take a half-open interval `[begin, end)` and expect
/// `begin < end`; callers pass intervals derived from trie ranks, which
/// always satisfy this. Wrap a prior in [BubbleWrapPrior] to assert it.
pub trait Prior: Send + Sync + fmt::Debug {
    /// Returns a finite, non-negative weight for an origination falling in
    /// `[begin, end)`, comparable against a differentia collision
    /// probability. Growth priors measure mass in units of the interval's
    /// densest rank.
    fn interval_probability_proxy(&self, begin: u64, end: u64) -> f64;

    /// Returns the expected origin generation given it lies in `[begin, end)`.
    fn interval_conditioned_mean(&self, begin: u64, end: u64) -> f64;

    /// Draws an origin generation from the prior restricted to `[begin, end)`.
    ///
    /// # Errors
    /// [HstratError::InvalidConfiguration] if the prior does not support
    /// sampling or the interval is empty.
    fn sample_interval_conditioned(&self, begin: u64, end: u64, rng: &mut dyn RngCore) -> Result<u64> {
        let _ = (begin, end, rng);
        Err(HstratError::config(format!("{self:?} does not support interval-conditioned sampling")))
    }
}

/// Checks that `[begin, end)` is non-empty.
///
/// # Errors
/// [HstratError::InvalidConfiguration] if `begin >= end`.
pub fn check_interval(begin: u64, end: u64) -> Result<()> {
    if begin < end {
        Ok(())
    } else {
        Err(HstratError::config(format!("empty rank interval [{begin}, {end})")))
    }
}

/// Validates a growth factor for [ExponentialPrior] / [GeometricPrior].
pub(crate) fn check_growth_factor(growth_factor: f64) -> Result<()> {
    if growth_factor.is_finite() && growth_factor > 0.0 {
        Ok(())
    } else {
        Err(HstratError::config(format!(
            "growth factor must be positive and finite, got {growth_factor}"
        )))
    }
}

/// Midpoint of the integer ranks in `[begin, end)`.
pub(crate) fn midpoint_mean(begin: u64, end: u64) -> f64 {
    (begin as f64 + end as f64 - 1.0) / 2.0
}

/// Clamps a mean into the integer ranks of `[begin, end)`.
pub(crate) fn clamp_to_interval(mean: f64, begin: u64, end: u64) -> f64 {
    mean.clamp(begin as f64, (end - 1) as f64)
}
