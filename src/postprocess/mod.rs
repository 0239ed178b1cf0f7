//! Trie postprocessors: transformations applied between building and export.
//!
//! Every postprocessor implements [TriePostprocessor]. It takes ownership of
//! a trie and returns one, given the probability `p_differentia_collision`
//! that two independently drawn fingerprints collide and a `mutate` flag
//! authorising in-place work.
//!
//! Provided postprocessors:
//! * [AssignOriginTimeNaive] - prior interval means, clamped to child ranks
//! * [AssignOriginTimeExpectedValue] - collision-corrected origin times
//! * [AssignOriginTimeNodeRank] - origin time is rank minus an epoch
//! * [AssignOriginTimeSample] - origin times drawn from a prior
//! * [AssignDestructionTime] - one past the earliest child origin
//! * [PeelBackConjoinedLeaves] - one leaf per host node
//! * [SampleAncestralRollbacks] - probabilistic sibling-to-cousin peeling
//! * [Compound] - sequential composition
//! * [Nop] - identity
//!
//! # Example
//! ```
//! use hstrat::model::Trie;
//! use hstrat::postprocess::{AssignDestructionTime, AssignOriginTimeNaive, Compound, TriePostprocessor};
//! use hstrat::prior::ArbitraryPrior;
//!
//! let mut trie = Trie::new();
//! let a = trie.add_inner(0, 0, 1);
//! trie.attach_leaf(a, "x".to_string());
//!
//! let pipeline = Compound::default()
//!     .with_stage(AssignOriginTimeNaive::new(ArbitraryPrior))
//!     .with_stage(AssignDestructionTime);
//! let trie = pipeline.apply(trie, 0.5, true, &mut |_| {}).unwrap();
//! assert_eq!(trie[a].origin_time(), Some(0.0));
//! assert_eq!(trie[a].destruction_time(), Some(1.0));
//! ```

mod assign_destruction_time;
mod assign_origin_time_expected_value;
mod assign_origin_time_naive;
mod assign_origin_time_node_rank;
mod assign_origin_time_sample;
mod peel_back_conjoined_leaves;
mod sample_ancestral_rollbacks;

pub use self::assign_destruction_time::AssignDestructionTime;
pub use self::assign_origin_time_expected_value::AssignOriginTimeExpectedValue;
pub use self::assign_origin_time_naive::AssignOriginTimeNaive;
pub use self::assign_origin_time_node_rank::{AssignOriginTimeNodeRank, Epoch};
pub use self::assign_origin_time_sample::AssignOriginTimeSample;
pub use self::peel_back_conjoined_leaves::PeelBackConjoinedLeaves;
pub use self::sample_ancestral_rollbacks::{
    SampleAncestralRollbacks, num_possible_rollbacks, p_collision_succession_corrected,
};

use crate::error::{HstratError, Result};
use crate::model::{NodeIndex, Trie};
use std::fmt;
use tracing::debug;

// =#========================================================================#=
// TRIE POSTPROCESSOR (trait)
// =#========================================================================#=
/// A transformation of a reconstructed trie.
///
/// # Arguments
/// * `trie` - Trie to transform; ownership passes to the postprocessor
/// * `p_differentia_collision` - Probability in `[0, 1]` that two independent
///   fingerprints collide, `2^-bitwidth`
/// * `mutate` - If `false`, the result is built on a detached deep copy
/// * `progress` - Called with the running count of visited nodes; must not
///   touch the trie
///
/// # Errors
/// [HstratError::InvalidConfiguration] for `p_differentia_collision` outside
/// `[0, 1]`, plus implementation-specific errors. On error the trie is lost.
pub trait TriePostprocessor: Send + Sync + fmt::Debug {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie>;
}

impl<T: TriePostprocessor + ?Sized> TriePostprocessor for Box<T> {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        (**self).apply(trie, p_differentia_collision, mutate, progress)
    }
}

/// Checks that `p` is a probability.
///
/// # Errors
/// [HstratError::InvalidConfiguration] for values outside `[0, 1]` or NaN.
pub fn check_p_differentia_collision(p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(HstratError::config(format!(
            "p_differentia_collision must lie in [0, 1], got {p}"
        )))
    }
}

/// Returns `trie` itself when mutation is allowed, else a deep copy.
pub(crate) fn take_or_copy(trie: Trie, mutate: bool) -> Trie {
    if mutate { trie } else { trie.deep_copy() }
}

/// Interval `[rank, end)` in which an inner node's allele originated:
/// `end` is the smallest inner child rank, or `rank + 1` without inner
/// children.
pub(crate) fn origin_interval(trie: &Trie, index: NodeIndex, rank: u64) -> (u64, u64) {
    let end = trie.min_inner_child_rank(index).unwrap_or(rank + 1);
    (rank, end)
}

/// Smallest rank among all children of an inner node, leaves reporting
/// the node's own rank.
pub(crate) fn min_child_rank(trie: &Trie, index: NodeIndex, rank: u64) -> Option<u64> {
    trie.children(index)
        .iter()
        .map(|&child| trie[child].own_rank().unwrap_or(rank))
        .min()
}

/// Origin time of a leaf: its parent's rank, 0 directly under the root.
pub(crate) fn leaf_origin_time(trie: &Trie, index: NodeIndex) -> f64 {
    trie.rank_of(index).unwrap_or(0) as f64
}

// =#========================================================================#=
// COMPOUND
// =#========================================================================#=
/// Applies postprocessors in sequence.
///
/// The first stage honours the caller's `mutate` flag; later stages always
/// mutate, since they receive the (already detached) output of their
/// predecessor. An empty compound behaves as [Nop].
#[derive(Debug, Default)]
pub struct Compound {
    stages: Vec<Box<dyn TriePostprocessor>>,
}

impl Compound {
    /// Creates a compound over the given stages, applied in order.
    pub fn new(stages: Vec<Box<dyn TriePostprocessor>>) -> Self {
        Compound { stages }
    }

    /// Appends a stage, consuming and returning the compound.
    pub fn with_stage(mut self, stage: impl TriePostprocessor + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Returns the number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if there are no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl TriePostprocessor for Compound {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        if self.stages.is_empty() {
            return Nop.apply(trie, p_differentia_collision, mutate, progress);
        }

        let mut trie = trie;
        let mut mutate = mutate;
        for (position, stage) in self.stages.iter().enumerate() {
            debug!(stage = position, postprocessor = ?stage, "applying compound stage");
            trie = stage.apply(trie, p_differentia_collision, mutate, progress)?;
            mutate = true;
        }
        Ok(trie)
    }
}

// =#========================================================================#=
// NOP
// =#========================================================================#=
/// Identity postprocessor; deep-copies when `mutate` is `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Nop;

impl TriePostprocessor for Nop {
    fn apply(
        &self,
        trie: Trie,
        p_differentia_collision: f64,
        mutate: bool,
        _progress: &mut dyn FnMut(u64),
    ) -> Result<Trie> {
        check_p_differentia_collision(p_differentia_collision)?;
        Ok(take_or_copy(trie, mutate))
    }
}
