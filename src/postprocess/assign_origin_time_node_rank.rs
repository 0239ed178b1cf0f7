use crate::error::{HstratError, Result};
use crate::model::Trie;
use crate::postprocess::{TriePostprocessor, check_p_differentia_collision, take_or_copy};
use tracing::debug;

/// Generation subtracted from node ranks by [AssignOriginTimeNodeRank].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Epoch {
    /// The same epoch for every node
    Fixed(i64),
    /// Per-node epoch read from the named node attribute, e.g. `"dstream_S"`
    Attribute(String),
}

impl Default for Epoch {
    fn default() -> Self {
        Epoch::Fixed(0)
    }
}

/// Sets `origin_time = rank - t0` for every node.
///
/// The root counts as rank 0 and leaves take their parent's rank. Applying
/// it twice gives the same trie as applying it once.
///
/// # Errors
/// [HstratError::InvalidConfiguration] if [Epoch::Attribute] names an
/// attribute some node lacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignOriginTimeNodeRank {
    epoch: Epoch,
}

impl AssignOriginTimeNodeRank {
    pub fn new(epoch: Epoch) -> Self {
        AssignOriginTimeNodeRank { epoch }
    }

    /// Shorthand for [Epoch::Attribute].
    pub fn with_epoch_attribute(name: impl Into<String>) -> Self {
        Self::new(Epoch::Attribute(name.into()))
    }
}

impl TriePostprocessor for AssignOriginTimeNodeRank {
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
            let rank = trie.rank_of(index).unwrap_or(0) as i64;
            let t0 = match &self.epoch {
                Epoch::Fixed(t0) => *t0,
                Epoch::Attribute(name) => trie[index].attribute(name).ok_or_else(|| {
                    HstratError::config(format!("node {index} lacks epoch attribute '{name}'"))
                })? as i64,
            };
            trie[index].set_origin_time((rank - t0) as f64);
            progress(index as u64 + 1);
        }

        debug!(epoch = ?self.epoch, num_nodes = trie.num_nodes(), "assigned node-rank origin times");
        Ok(trie)
    }
}
