use crate::error::Result;
use crate::model::{NodeIndex, Trie};
use crate::postprocess::{TriePostprocessor, check_p_differentia_collision, take_or_copy};
use crate::rng::{SeededRngScope, with_ambient_rng};
use rand::Rng;
use tracing::debug;

/// Probabilistic correction for spurious fingerprint collisions.
///
/// Collisions at intermediate ranks glue unrelated lineages together and
/// make taxa look more closely related than they are. This postprocessor
/// undoes an expected number of such merges by *peeling sibling to cousin*:
/// the parent of a randomly chosen eligible node is copied under its
/// grandparent and the node moves onto the copy.
///
/// A node is eligible while it is an inner node, its parent is not the root,
/// and its parent has more than one child (leaves included). The number of
/// rollbacks is
///
/// ```text
/// E = floor(min(L, num_leaves * p'))
/// L = sum over inner nodes of (leaf count - 1)
/// p' = p / (1 - p)  if p <= 0.5
///      p            otherwise
/// ```
///
/// Candidates are drawn uniformly without replacement (swap-remove from a
/// lazily pruned list); stale draws are discarded. Sampling stops after `E`
/// rollbacks or when no candidates remain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleAncestralRollbacks {
    seed: Option<u64>,
}

impl SampleAncestralRollbacks {
    /// Creates the sampler; `seed = None` draws from the caller's ambient
    /// generator state.
    pub fn new(seed: Option<u64>) -> Self {
        SampleAncestralRollbacks { seed }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

/// Collision probability corrected for runs of successive collisions.
///
/// Values above one half are passed through unchanged (bounds testing).
pub fn p_collision_succession_corrected(p_differentia_collision: f64) -> f64 {
    if p_differentia_collision <= 0.5 {
        p_differentia_collision / (1.0 - p_differentia_collision)
    } else {
        p_differentia_collision
    }
}

/// Number of leaves that could be peeled off without emptying their parent.
pub fn num_possible_rollbacks(trie: &Trie) -> u64 {
    let leaf_counts = trie.leaf_counts();
    trie.nodes()
        .iter()
        .filter(|node| node.is_inner())
        .map(|node| leaf_counts[node.index()].saturating_sub(1) as u64)
        .sum()
}

fn is_eligible(trie: &Trie, index: NodeIndex) -> bool {
    if !trie[index].is_inner() {
        return false;
    }
    match trie.parent(index) {
        Some(parent) => trie[parent].is_inner() && trie.children(parent).len() > 1,
        None => false,
    }
}

impl TriePostprocessor for SampleAncestralRollbacks {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        let mut trie = take_or_copy(trie, mutate);

        let possible = num_possible_rollbacks(&trie);
        let unzip_opportunities = trie.num_leaves() as f64;
        let expected = (possible as f64)
            .min(unzip_opportunities * p_collision_succession_corrected(p_differentia_collision))
            .floor() as u64;

        let mut candidates: Vec<NodeIndex> = (0..trie.num_nodes())
            .filter(|&index| is_eligible(&trie, index))
            .collect();
        debug!(
            num_eligible = candidates.len(),
            num_possible = possible,
            num_expected = expected,
            "sampling ancestral rollbacks"
        );

        let _scope = SeededRngScope::enter(self.seed);
        let mut performed = 0u64;
        while performed < expected && !candidates.is_empty() {
            let draw = with_ambient_rng(|rng| rng.gen_range(0..candidates.len()));
            let target = candidates.swap_remove(draw);
            if !is_eligible(&trie, target) {
                continue;
            }

            // Eligibility guarantees an inner parent, which always has a parent
            let Some(parent) = trie.parent(target) else {
                continue;
            };
            let Some(grandparent) = trie.parent(parent) else {
                continue;
            };
            let cousin_parent = trie.clone_inner_under(parent, grandparent);
            trie.reparent(target, cousin_parent);

            candidates.push(cousin_parent);
            candidates.push(parent);
            performed += 1;
            progress(performed);
        }

        debug!(num_performed = performed, "sampled ancestral rollbacks");
        Ok(trie)
    }
}

// =#========================================================================#=
// TESTS - ROLLBACK ARITHMETIC
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succession_correction_branches() {
        assert_eq!(p_collision_succession_corrected(0.0), 0.0);
        assert_eq!(p_collision_succession_corrected(0.5), 1.0);
        assert!((p_collision_succession_corrected(0.25) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(p_collision_succession_corrected(0.75), 0.75);
        assert_eq!(p_collision_succession_corrected(1.0), 1.0);
    }

    #[test]
    fn test_possible_rollbacks_counts_extra_leaves() {
        // root -> a -> {b -> {l1, l2}, c -> l3}
        let mut trie = Trie::new();
        let a = trie.add_inner(0, 0, 0);
        let b = trie.add_inner(a, 1, 0);
        let c = trie.add_inner(a, 1, 1);
        trie.attach_leaf(b, "1".to_string());
        trie.attach_leaf(b, "2".to_string());
        trie.attach_leaf(c, "3".to_string());
        // a: 3 - 1, b: 2 - 1, c: 0
        assert_eq!(num_possible_rollbacks(&trie), 3);
    }

    #[test]
    fn test_zero_probability_is_identity() {
        let mut trie = Trie::new();
        let a = trie.add_inner(0, 0, 0);
        let b = trie.add_inner(a, 1, 0);
        let c = trie.add_inner(a, 1, 1);
        trie.attach_leaf(b, "1".to_string());
        trie.attach_leaf(c, "2".to_string());

        let before = trie.num_nodes();
        let trie = SampleAncestralRollbacks::new(Some(1))
            .apply(trie, 0.0, true, &mut |_| {})
            .unwrap();
        assert_eq!(trie.num_nodes(), before);
    }
}
