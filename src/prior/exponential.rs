use crate::error::Result;
use crate::prior::{
    Prior, UNIT_GROWTH_EPSILON, UniformPrior, check_growth_factor, check_interval, clamp_to_interval,
};
use rand::{Rng, RngCore};

/// Below this `|log(f) * width|` the mean is evaluated by series expansion.
const SERIES_THRESHOLD: f64 = 1e-6;

/// Prior density proportional to `f^rank`, treated as continuous.
///
/// `f > 1` favours recent origins (growing populations), `f < 1` favours
/// ancient ones. With `f == 1` every call is answered by [UniformPrior].
///
/// The probability proxy is the interval's mass measured in units of its
/// densest rank. It stays finite at any rank, never exceeds the interval
/// width and tends to the uniform proxy as `f` approaches 1.
///
/// # Example
/// ```
/// use hstrat::prior::{ExponentialPrior, Prior};
///
/// let prior = ExponentialPrior::new(1.1).unwrap();
/// let mean = prior.interval_conditioned_mean(10, 20);
/// assert!(mean > 14.5 && mean < 19.0);
/// assert!(ExponentialPrior::new(-1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialPrior {
    growth_factor: f64,
}

impl ExponentialPrior {
    /// Creates an exponential prior with the given per-rank growth factor.
    ///
    /// # Errors
    /// [HstratError::InvalidConfiguration](crate::HstratError::InvalidConfiguration)
    /// unless `growth_factor` is positive and finite.
    pub fn new(growth_factor: f64) -> Result<Self> {
        check_growth_factor(growth_factor)?;
        Ok(ExponentialPrior { growth_factor })
    }

    /// Returns the per-rank growth factor.
    pub fn growth_factor(&self) -> f64 {
        self.growth_factor
    }

    fn log_growth(&self) -> f64 {
        self.growth_factor.ln()
    }

    fn is_unit(&self) -> bool {
        self.log_growth().abs() < UNIT_GROWTH_EPSILON
    }
}

impl Prior for ExponentialPrior {
    fn interval_probability_proxy(&self, begin: u64, end: u64) -> f64 {
        if self.is_unit() {
            return UniformPrior.interval_probability_proxy(begin, end);
        }
        // Integral of f^x over the interval divided by its peak density, so
        // only the width enters: (1 - e^(-|ln f| n)) / |ln f|
        let lambda = self.log_growth().abs();
        let width = end.saturating_sub(begin) as f64;
        -(-lambda * width).exp_m1() / lambda
    }

    fn interval_conditioned_mean(&self, begin: u64, end: u64) -> f64 {
        if self.is_unit() {
            return UniformPrior.interval_conditioned_mean(begin, end);
        }
        if end <= begin + 1 {
            return begin as f64;
        }

        // Mean of density ~ f^x on [begin, end - 1], shifted to begin
        let lambda = self.log_growth();
        let width = (end - 1 - begin) as f64;
        let t = lambda * width;
        let offset = if t.abs() < SERIES_THRESHOLD {
            width * (0.5 + t / 12.0)
        } else {
            width / -(-t).exp_m1() - 1.0 / lambda
        };
        clamp_to_interval(begin as f64 + offset, begin, end)
    }

    fn sample_interval_conditioned(&self, begin: u64, end: u64, rng: &mut dyn RngCore) -> Result<u64> {
        check_interval(begin, end)?;
        if self.is_unit() {
            return UniformPrior.sample_interval_conditioned(begin, end, rng);
        }

        // Inverse CDF of density ~ f^x on [begin, end), floored
        let lambda = self.log_growth();
        let width = (end - begin) as f64;
        let u: f64 = rng.gen_range(0.0..1.0);
        let offset = if lambda > 0.0 {
            let tail = (-lambda * width).exp();
            width + (tail + u * (1.0 - tail)).ln() / lambda
        } else {
            (u * (lambda * width).exp_m1()).ln_1p() / lambda
        };
        let sample = begin as f64 + offset.max(0.0).floor();
        Ok((sample as u64).min(end - 1))
    }
}
