use crate::error::Result;
use crate::model::Trie;
use crate::postprocess::assign_origin_time_naive::naive_origin_time;
use crate::postprocess::{TriePostprocessor, check_p_differentia_collision, take_or_copy};
use crate::prior::Prior;
use crate::rng::{SeededRngScope, with_ambient_rng};
use std::sync::Arc;
use tracing::debug;

/// Draws each inner node's origin time from the prior over its origin
/// interval, clamped to its children's ranks as in
/// [AssignOriginTimeNaive](crate::postprocess::AssignOriginTimeNaive).
///
/// Draws come from the ambient generator, seeded for the duration of the
/// call when `seed` is set.
///
/// # Errors
/// [HstratError::InvalidConfiguration](crate::HstratError::InvalidConfiguration)
/// if the prior does not support sampling.
#[derive(Debug, Clone)]
pub struct AssignOriginTimeSample {
    prior: Arc<dyn Prior>,
    seed: Option<u64>,
}

impl AssignOriginTimeSample {
    pub fn new(prior: impl Prior + 'static, seed: Option<u64>) -> Self {
        Self::from_shared(Arc::new(prior), seed)
    }

    pub fn from_shared(prior: Arc<dyn Prior>, seed: Option<u64>) -> Self {
        AssignOriginTimeSample { prior, seed }
    }
}

impl TriePostprocessor for AssignOriginTimeSample {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        let mut trie = take_or_copy(trie, mutate);
        let _scope = SeededRngScope::enter(self.seed);

        let order: Vec<_> = trie.pre_order_iter().map(|node| node.index()).collect();
        for (visited, index) in order.into_iter().enumerate() {
            let origin_time = naive_origin_time(&trie, index, |begin, end| {
                with_ambient_rng(|rng| self.prior.sample_interval_conditioned(begin, end, rng))
                    .map(|sample| sample as f64)
            })?;
            trie[index].set_origin_time(origin_time);
            progress(visited as u64 + 1);
        }

        debug!(seed = ?self.seed, num_nodes = trie.num_nodes(), "sampled origin times");
        Ok(trie)
    }
}
