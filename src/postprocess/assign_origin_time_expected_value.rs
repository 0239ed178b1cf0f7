use crate::error::Result;
use crate::model::{NodeKind, Trie};
use crate::postprocess::assign_origin_time_naive::naive_origin_times;
use crate::postprocess::{TriePostprocessor, check_p_differentia_collision, origin_interval, take_or_copy};
use crate::prior::Prior;
use std::sync::Arc;
use tracing::debug;

/// Collision-corrected origin times.
///
/// A shared allele may be a spurious collision, in which case the node
/// "really" originated with its parent. Each inner node's origin time is
/// therefore the weighted average of its parent's (already corrected)
/// origin time and its naive origin time, weighted by
/// `p_differentia_collision` and the prior's probability proxy over the
/// node's origin interval, respectively. Root and leaves are assigned as in
/// [AssignOriginTimeNaive](crate::postprocess::AssignOriginTimeNaive).
#[derive(Debug, Clone)]
pub struct AssignOriginTimeExpectedValue {
    prior: Arc<dyn Prior>,
}

impl AssignOriginTimeExpectedValue {
    pub fn new(prior: impl Prior + 'static) -> Self {
        Self::from_shared(Arc::new(prior))
    }

    pub fn from_shared(prior: Arc<dyn Prior>) -> Self {
        AssignOriginTimeExpectedValue { prior }
    }
}

impl TriePostprocessor for AssignOriginTimeExpectedValue {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        let mut trie = take_or_copy(trie, mutate);

        let naive = naive_origin_times(&trie, self.prior.as_ref(), &mut |_| {});

        let order: Vec<_> = trie.pre_order_iter().map(|node| node.index()).collect();
        for (visited, index) in order.into_iter().enumerate() {
            let origin_time = match trie[index].kind() {
                NodeKind::Inner { rank, .. } => {
                    let parent_origin = trie
                        .parent(index)
                        .and_then(|parent| trie[parent].origin_time())
                        .unwrap_or(0.0);
                    let (begin, end) = origin_interval(&trie, index, *rank);
                    let proxy = self.prior.interval_probability_proxy(begin, end);
                    weighted_origin_time(parent_origin, naive[index], p_differentia_collision, proxy)
                }
                _ => naive[index],
            };
            trie[index].set_origin_time(origin_time);
            progress(visited as u64 + 1);
        }

        debug!(num_nodes = trie.num_nodes(), p_differentia_collision, "assigned expected-value origin times");
        Ok(trie)
    }
}

/// Posterior mean of parent-origin vs. own-origin; falls back to the naive
/// estimate when the weights are degenerate.
fn weighted_origin_time(parent_origin: f64, naive: f64, parent_weight: f64, own_weight: f64) -> f64 {
    let total = parent_weight + own_weight;
    if total > 0.0 && total.is_finite() {
        (parent_weight * parent_origin + own_weight * naive) / total
    } else {
        naive
    }
}

// =#========================================================================#=
// TESTS - EXPECTED VALUE
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::prior::UniformPrior;

    #[test]
    fn test_weighted_origin_time_degenerate_weights() {
        assert_eq!(weighted_origin_time(1.0, 5.0, 0.0, 0.0), 5.0);
        assert_eq!(weighted_origin_time(1.0, 5.0, 0.5, f64::INFINITY), 5.0);
        assert_eq!(weighted_origin_time(1.0, 5.0, 1.0, 1.0), 3.0);
    }

    #[test]
    fn test_zero_collision_probability_matches_naive() {
        let mut trie = Trie::new();
        let a = trie.add_inner(0, 0, 1);
        let b = trie.add_inner(a, 4, 2);
        trie.attach_leaf(b, "x".to_string());

        let trie = AssignOriginTimeExpectedValue::new(UniformPrior)
            .apply(trie, 0.0, true, &mut |_| {})
            .unwrap();
        // Naive: a -> mean over [0, 4) = 1.5, b -> 4
        assert_eq!(trie[a].origin_time(), Some(1.5));
        assert_eq!(trie[b].origin_time(), Some(4.0));
    }

    #[test]
    fn test_collision_pulls_toward_parent() {
        let mut trie = Trie::new();
        let a = trie.add_inner(0, 0, 1);
        let b = trie.add_inner(a, 4, 2);
        let c = trie.add_inner(b, 10, 3);
        trie.attach_leaf(c, "x".to_string());

        let trie = AssignOriginTimeExpectedValue::new(UniformPrior)
            .apply(trie, 1.0, true, &mut |_| {})
            .unwrap();
        let a_time = trie[a].origin_time().unwrap();
        let b_time = trie[b].origin_time().unwrap();
        // b's naive is mean over [4, 10) = 6.5, weights (1, 6)
        assert!((b_time - (a_time + 6.0 * 6.5) / 7.0).abs() < 1e-12);
        assert!(b_time >= a_time);
    }
}
