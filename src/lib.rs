//! Hstrat is a library to reconstruct phylogenies from hereditary
//! stratigraphic annotations.
//!
//! An annotation is a sequence of `(rank, differentia)` pairs: at each rank
//! a lineage deposits a random fingerprint of a fixed bitwidth, and only a
//! subset of these strata is retained. Annotations that agree on their
//! fingerprints share ancestry up to their first disagreement, so a
//! population can be merged into a prefix tree (trie) whose leaves are the
//! population members.
//!
//! Core functionality provided:
//! - Reconstruction:
//!   - Scalar: [build_tree_trie] places the alleles of each annotation into
//!     a trie, see [crate::reconstruction].
//!   - Bulk: [surface_build_tree] builds tries over slices of an exploded
//!     frame in parallel with a searchtable, see [crate::dataframe].
//! - Postprocessing: origin time estimation under interval [priors](crate::prior),
//!   destruction times and bias corrections for fingerprint collisions,
//!   see [crate::postprocess].
//! - Output: [PhylogenyTable](crate::model::PhylogenyTable) rows
//!   `{id, ancestor_id, origin_time, ...}`, renderable as a
//!   [Frame](crate::dataframe::Frame) or [Newick](crate::newick) strings.
//! - Tree model: the [Trie](crate::model::Trie) uses the arena pattern,
//!   so no direct node references are stored, only node indices.
//!
//! Random postprocessors draw from a thread-local generator that can be
//! seeded for a scope, see [crate::rng].
//!
//! # Usage patterns
//! 1. The quick functions below run the full pipelines with default
//!    settings.
//! 2. Configure [BuildTreeTrie](crate::reconstruction::BuildTreeTrie) or
//!    [SurfaceBuildTree](crate::dataframe::SurfaceBuildTree) for full
//!    control over labels, seeds, bias adjustment, slicing and trunk
//!    handling.
//!
//! ## Example Scalar Reconstruction
//! ```
//! use hstrat::model::Annotation;
//! use hstrat::reconstruction::BiasAdjustment;
//!
//! let population = vec![
//!     Annotation::new(3, 8, vec![(0, 10), (1, 20), (2, 30)]).unwrap(),
//!     Annotation::new(3, 8, vec![(0, 10), (1, 20), (2, 31)]).unwrap(),
//!     Annotation::new(3, 8, vec![(0, 10), (1, 21), (2, 32)]).unwrap(),
//! ];
//! let table = hstrat::build_tree_trie(&population, None, false, Some(1), BiasAdjustment::None)?;
//!
//! assert_eq!(table.leaf_ids().len(), 3);
//! println!("{}", hstrat::newick::to_newick(&table)?.join("\n"));
//! # Ok::<(), hstrat::HstratError>(())
//! ```
//!
//! ## Example Bulk Reconstruction
//! ```
//! use hstrat::dataframe::explode_annotations;
//! use hstrat::model::Annotation;
//!
//! let population: Vec<(u64, Annotation)> = (0..4)
//!     .map(|data_id| {
//!         let retained = (0..6).map(|rank| (rank, (data_id * rank) % 2)).collect();
//!         (data_id, Annotation::new(6, 1, retained).unwrap())
//!     })
//!     .collect();
//! let frame = explode_annotations(&population, 2)?;
//!
//! let phylogeny = hstrat::surface_build_tree(&frame)?;
//! assert!(phylogeny.has_column("ancestor_id"));
//! # Ok::<(), hstrat::HstratError>(())
//! ```

pub mod dataframe;
pub mod error;
pub mod model;
pub mod newick;
pub mod postprocess;
pub mod prior;
pub mod reconstruction;
pub mod rng;

pub use crate::error::{HstratError, Result};

use crate::dataframe::Frame;
use crate::model::{HereditaryStratigraphicArtifact, PhylogenyTable};
use crate::reconstruction::BiasAdjustment;

// ============================================================================
// Quick Scalar API
// ============================================================================
/// Reconstructs the phylogeny of a population of annotations.
///
/// See [`reconstruction::build_tree_trie`] for full documentation.
pub fn build_tree_trie<A: HereditaryStratigraphicArtifact>(
    population: &[A],
    taxon_labels: Option<Vec<String>>,
    force_common_ancestry: bool,
    seed: Option<u64>,
    bias_adjustment: BiasAdjustment,
) -> Result<PhylogenyTable> {
    reconstruction::build_tree_trie(population, taxon_labels, force_common_ancestry, seed, bias_adjustment)
}

// ============================================================================
// Quick Bulk API
// ============================================================================
/// Reconstructs the phylogeny of an exploded annotation frame using default
/// settings.
///
/// See [`dataframe::surface_build_tree`] for full documentation.
pub fn surface_build_tree(frame: &Frame) -> Result<Frame> {
    dataframe::surface_build_tree(frame)
}
