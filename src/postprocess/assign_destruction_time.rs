use crate::error::{HstratError, Result};
use crate::model::Trie;
use crate::postprocess::{TriePostprocessor, check_p_differentia_collision, take_or_copy};

/// Sets destruction times from already assigned origin times.
///
/// Leaves are never destroyed (`+inf`); an inner node (or the root) is
/// destroyed one generation after its earliest child originates. A childless
/// root is never destroyed.
///
/// # Errors
/// [HstratError::InvalidConfiguration] if any node lacks an origin time;
/// compose after an origin-time postprocessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignDestructionTime;

impl TriePostprocessor for AssignDestructionTime {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        let mut trie = take_or_copy(trie, mutate);

        for index in 0..trie.num_nodes() {
            let node = &trie[index];
            let destruction_time = if node.is_leaf() {
                f64::INFINITY
            } else {
                let mut earliest = f64::INFINITY;
                for &child in node.children() {
                    let origin_time = trie[child].origin_time().ok_or_else(|| {
                        HstratError::config(format!(
                            "node {child} has no origin time; assign origin times before destruction times"
                        ))
                    })?;
                    earliest = earliest.min(origin_time);
                }
                earliest + 1.0
            };
            trie[index].set_destruction_time(destruction_time);
            progress(index as u64 + 1);
        }

        Ok(trie)
    }
}
