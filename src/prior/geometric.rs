use crate::error::Result;
use crate::prior::{
    Prior, UNIT_GROWTH_EPSILON, UniformPrior, check_growth_factor, check_interval, clamp_to_interval,
};
use rand::{Rng, RngCore};

/// Discrete prior with mass proportional to `f^rank` at each integer rank.
///
/// As for [ExponentialPrior](crate::prior::ExponentialPrior), the proxy
/// counts the interval's mass in units of its heaviest rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricPrior {
    growth_factor: f64,
}

impl GeometricPrior {
    /// Creates a geometric prior with the given per-rank growth factor.
    ///
    /// # Errors
    /// [HstratError::InvalidConfiguration](crate::HstratError::InvalidConfiguration)
    /// unless `growth_factor` is positive and finite.
    pub fn new(growth_factor: f64) -> Result<Self> {
        check_growth_factor(growth_factor)?;
        Ok(GeometricPrior { growth_factor })
    }

    /// Returns the per-rank growth factor.
    pub fn growth_factor(&self) -> f64 {
        self.growth_factor
    }

    fn is_unit(&self) -> bool {
        self.growth_factor.ln().abs() < UNIT_GROWTH_EPSILON
    }
}

/// Mean offset of weights `r^k` over `k in 0..n`, for `0 < r < 1`.
fn decaying_mean_offset(r: f64, n: u64) -> f64 {
    let n_f = n as f64;
    let r_n = r.powf(n_f);
    r / (1.0 - r) - n_f * r_n / (1.0 - r_n)
}

/// Index drawn with weights `r^k` over `k in 0..n`, for `0 < r < 1`.
fn sample_decaying_offset(r: f64, n: u64, u: f64) -> u64 {
    let log_r = r.ln();
    // 1 - r^n, precise for r close to 1
    let mass = -(n as f64 * log_r).exp_m1();
    let offset = ((-u * mass).ln_1p() / log_r).floor();
    (offset.max(0.0) as u64).min(n - 1)
}

impl Prior for GeometricPrior {
    fn interval_probability_proxy(&self, begin: u64, end: u64) -> f64 {
        if self.is_unit() {
            return UniformPrior.interval_probability_proxy(begin, end);
        }
        // Sum of r^k over k in 0..n with r = e^(-|ln f|) <= 1
        let lambda = self.growth_factor.ln().abs();
        let n = end.saturating_sub(begin) as f64;
        (-lambda * n).exp_m1() / (-lambda).exp_m1()
    }

    fn interval_conditioned_mean(&self, begin: u64, end: u64) -> f64 {
        if self.is_unit() {
            return UniformPrior.interval_conditioned_mean(begin, end);
        }
        let n = end.saturating_sub(begin);
        if n <= 1 {
            return begin as f64;
        }

        let offset = if self.growth_factor < 1.0 {
            decaying_mean_offset(self.growth_factor, n)
        } else {
            // Mirror image of the decaying case
            (n - 1) as f64 - decaying_mean_offset(1.0 / self.growth_factor, n)
        };
        clamp_to_interval(begin as f64 + offset, begin, end)
    }

    fn sample_interval_conditioned(&self, begin: u64, end: u64, rng: &mut dyn RngCore) -> Result<u64> {
        check_interval(begin, end)?;
        if self.is_unit() {
            return UniformPrior.sample_interval_conditioned(begin, end, rng);
        }

        let n = end - begin;
        let u: f64 = rng.gen_range(0.0..1.0);
        let offset = if self.growth_factor < 1.0 {
            sample_decaying_offset(self.growth_factor, n, u)
        } else {
            n - 1 - sample_decaying_offset(1.0 / self.growth_factor, n, u)
        };
        Ok(begin + offset)
    }
}
