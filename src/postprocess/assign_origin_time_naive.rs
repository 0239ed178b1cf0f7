use crate::error::Result;
use crate::model::{NodeIndex, NodeKind, Trie};
use crate::postprocess::{
    TriePostprocessor, check_p_differentia_collision, leaf_origin_time, min_child_rank, origin_interval,
    take_or_copy,
};
use crate::prior::{ArbitraryPrior, Prior};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Assigns each node the prior's mean over its origin interval.
///
/// - root: `0`
/// - leaf: its parent's rank
/// - inner: `min(I, smallest child rank)` with
///   `I = prior.interval_conditioned_mean(rank, end)`, where `end` is the
///   smallest inner child rank or `rank + 1`; leaf children count with the
///   node's own rank
///
/// The clamp keeps origin times non-decreasing from parent to child.
#[derive(Debug, Clone)]
pub struct AssignOriginTimeNaive {
    prior: Arc<dyn Prior>,
}

impl AssignOriginTimeNaive {
    pub fn new(prior: impl Prior + 'static) -> Self {
        Self::from_shared(Arc::new(prior))
    }

    pub fn from_shared(prior: Arc<dyn Prior>) -> Self {
        AssignOriginTimeNaive { prior }
    }

    pub fn prior(&self) -> &Arc<dyn Prior> {
        &self.prior
    }
}

impl Default for AssignOriginTimeNaive {
    fn default() -> Self {
        Self::new(ArbitraryPrior)
    }
}

/// Naive origin time of one node; the interval mean is computed by `estimate`.
pub(crate) fn naive_origin_time<E>(
    trie: &Trie,
    index: NodeIndex,
    mut estimate: impl FnMut(u64, u64) -> std::result::Result<f64, E>,
) -> std::result::Result<f64, E> {
    match trie[index].kind() {
        NodeKind::Root => Ok(0.0),
        NodeKind::Leaf { .. } => Ok(leaf_origin_time(trie, index)),
        NodeKind::Inner { rank, .. } => {
            let (begin, end) = origin_interval(trie, index, *rank);
            let estimate = estimate(begin, end)?;
            Ok(match min_child_rank(trie, index, *rank) {
                Some(bound) => estimate.min(bound as f64),
                None => estimate,
            })
        }
    }
}

/// Naive origin times for every node, indexed by [NodeIndex].
pub(crate) fn naive_origin_times(trie: &Trie, prior: &dyn Prior, progress: &mut dyn FnMut(u64)) -> Vec<f64> {
    let mut origin_times = vec![0.0; trie.num_nodes()];
    for (visited, node) in trie.pre_order_iter().enumerate() {
        let index = node.index();
        let Ok(origin_time) = naive_origin_time(trie, index, |begin, end| {
            Ok::<f64, Infallible>(prior.interval_conditioned_mean(begin, end))
        });
        origin_times[index] = origin_time;
        progress(visited as u64 + 1);
    }
    origin_times
}

impl TriePostprocessor for AssignOriginTimeNaive {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        let mut trie = take_or_copy(trie, mutate);

        let origin_times = naive_origin_times(&trie, self.prior.as_ref(), progress);
        for (index, origin_time) in origin_times.into_iter().enumerate() {
            trie[index].set_origin_time(origin_time);
        }

        debug!(num_nodes = trie.num_nodes(), prior = ?self.prior, "assigned naive origin times");
        Ok(trie)
    }
}
