//! Trie construction and export.
//!
//! Two builders produce a [Trie](crate::model::Trie):
//! * [build_trie_from_artifacts] - scalar allele placement over annotations
//! * [Searchtable](searchtable::Searchtable) - bulk construction from
//!   exploded rows with overlay consolidation
//!
//! [trie_to_phylogeny] lowers a (postprocessed) trie into a
//! [PhylogenyTable](crate::model::PhylogenyTable).
//!
//! # Quick API
//! * [build_tree_trie] - full scalar pipeline with explicit options
//!
//! # Full API
//! * [BuildTreeTrie] - builder for the scalar pipeline

pub mod build_tree_trie;
pub mod build_trie;
pub mod export;
pub mod searchtable;

pub use self::build_tree_trie::{BiasAdjustment, BuildTreeTrie, build_tree_trie};
pub use self::build_trie::build_trie_from_artifacts;
pub use self::export::trie_to_phylogeny;
pub use self::searchtable::{Searchtable, TaxonAlleles};
