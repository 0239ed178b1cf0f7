use crate::error::Result;
use crate::prior::{Prior, check_interval, midpoint_mean};
use rand::{Rng, RngCore};

/// Every generation is equally likely a priori.
///
/// # Example
/// ```
/// use hstrat::prior::{Prior, UniformPrior};
///
/// let prior = UniformPrior;
/// assert_eq!(prior.interval_probability_proxy(3, 7), 4.0);
/// assert_eq!(prior.interval_conditioned_mean(3, 7), 4.5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UniformPrior;

impl Prior for UniformPrior {
    fn interval_probability_proxy(&self, begin: u64, end: u64) -> f64 {
        end.saturating_sub(begin) as f64
    }

    fn interval_conditioned_mean(&self, begin: u64, end: u64) -> f64 {
        midpoint_mean(begin, end)
    }

    fn sample_interval_conditioned(&self, begin: u64, end: u64, rng: &mut dyn RngCore) -> Result<u64> {
        check_interval(begin, end)?;
        Ok(rng.gen_range(begin..end))
    }
}
