use crate::error::Result;
use crate::prior::Prior;
use rand::RngCore;

/// Decorator that asserts the [Prior] contract around every call.
///
/// # Panics
/// Every method panics if the interval is empty, and additionally if the
/// wrapped prior returns a negative (or NaN) proxy, a mean outside
/// `[begin, end)`, or a sample outside `[begin, end)`.
///
/// # Example
/// ```
/// use hstrat::prior::{BubbleWrapPrior, Prior, UniformPrior};
///
/// let prior = BubbleWrapPrior::new(UniformPrior);
/// assert_eq!(prior.interval_conditioned_mean(0, 3), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct BubbleWrapPrior<P: Prior> {
    inner: P,
}

impl<P: Prior> BubbleWrapPrior<P> {
    /// Wraps `inner`.
    pub fn new(inner: P) -> Self {
        BubbleWrapPrior { inner }
    }

    /// Returns the wrapped prior.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

fn assert_interval(begin: u64, end: u64) {
    assert!(begin < end, "empty rank interval [{begin}, {end})");
}

impl<P: Prior> Prior for BubbleWrapPrior<P> {
    fn interval_probability_proxy(&self, begin: u64, end: u64) -> f64 {
        assert_interval(begin, end);
        let proxy = self.inner.interval_probability_proxy(begin, end);
        assert!(proxy >= 0.0, "negative probability proxy {proxy} on [{begin}, {end})");
        proxy
    }

    fn interval_conditioned_mean(&self, begin: u64, end: u64) -> f64 {
        assert_interval(begin, end);
        let mean = self.inner.interval_conditioned_mean(begin, end);
        assert!(
            mean >= begin as f64 && mean < end as f64,
            "interval mean {mean} outside [{begin}, {end})"
        );
        mean
    }

    fn sample_interval_conditioned(&self, begin: u64, end: u64, rng: &mut dyn RngCore) -> Result<u64> {
        assert_interval(begin, end);
        let sample = self.inner.sample_interval_conditioned(begin, end, rng)?;
        assert!((begin..end).contains(&sample), "sample {sample} outside [{begin}, {end})");
        Ok(sample)
    }
}
