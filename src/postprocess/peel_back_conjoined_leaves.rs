use crate::error::Result;
use crate::model::Trie;
use crate::postprocess::{TriePostprocessor, check_p_differentia_collision, take_or_copy};
use tracing::debug;

/// Separates leaves that share a host node.
///
/// Two taxa whose most recent retained strata coincide end up as sibling
/// leaves, although their match at that rank is at best a collision. For
/// every inner node hosting more than one leaf, the first leaf stays and each
/// further leaf moves onto a fresh copy of the host attached to the host's
/// parent. Afterwards every node hosts at most one leaf.
///
/// # Example
/// ```
/// use hstrat::model::Trie;
/// use hstrat::postprocess::{PeelBackConjoinedLeaves, TriePostprocessor};
///
/// let mut trie = Trie::new();
/// let a = trie.add_inner(0, 0, 1);
/// let b = trie.add_inner(a, 1, 1);
/// trie.attach_leaf(b, "x".to_string());
/// trie.attach_leaf(b, "y".to_string());
///
/// let trie = PeelBackConjoinedLeaves.apply(trie, 0.5, true, &mut |_| {}).unwrap();
/// assert_eq!(trie.children(a).len(), 2);
/// assert!(trie.is_valid());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeelBackConjoinedLeaves;

impl TriePostprocessor for PeelBackConjoinedLeaves {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        let mut trie = take_or_copy(trie, mutate);

        // Copies appended below host exactly one leaf, so only original nodes need a visit
        let num_original = trie.num_nodes();
        let mut num_peeled = 0usize;
        for host in 0..num_original {
            if !trie[host].is_inner() {
                progress(host as u64 + 1);
                continue;
            }
            let Some(grandparent) = trie.parent(host) else {
                continue;
            };

            let extra_leaves: Vec<_> = trie.leaf_children(host).skip(1).collect();
            for leaf in extra_leaves {
                let copy = trie.clone_inner_under(host, grandparent);
                trie.reparent(leaf, copy);
                num_peeled += 1;
            }
            progress(host as u64 + 1);
        }

        debug!(num_peeled, "peeled back conjoined leaves");
        Ok(trie)
    }
}
