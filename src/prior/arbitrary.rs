use crate::error::Result;
use crate::prior::{Prior, check_interval, midpoint_mean};
use rand::{Rng, RngCore};

/// Places no weight preference on any interval.
///
/// Proxy is constant, the mean is the interval midpoint and samples are
/// uniform over the interval's integer ranks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArbitraryPrior;

impl Prior for ArbitraryPrior {
    fn interval_probability_proxy(&self, _begin: u64, _end: u64) -> f64 {
        1.0
    }

    fn interval_conditioned_mean(&self, begin: u64, end: u64) -> f64 {
        midpoint_mean(begin, end)
    }

    fn sample_interval_conditioned(&self, begin: u64, end: u64, rng: &mut dyn RngCore) -> Result<u64> {
        check_interval(begin, end)?;
        Ok(rng.gen_range(begin..end))
    }
}
