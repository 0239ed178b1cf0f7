//! Data model for trie-based reconstruction.
//!
//! * [Annotation] and the [HereditaryStratigraphicArtifact] trait describe
//!   the ranked fingerprint sequences fed into the builders.
//! * [Trie] / [TrieNode] hold the reconstructed prefix tree (arena pattern,
//!   only node indices are stored, never references).
//! * [PhylogenyTable] / [PhylogenyRow] are the exported, flat form.

/// Ranked fingerprint sequences
pub mod annotation;
/// Exported phylogeny rows and table transforms
pub mod phylogeny;
/// Trie arena and traversal
pub mod trie;
/// Trie node types (root, inner, leaf)
pub mod trie_node;

pub use self::annotation::{Annotation, HereditaryStratigraphicArtifact};
pub use self::phylogeny::{PhylogenyRow, PhylogenyTable, UnifurcationCollapse, Value};
pub use self::trie::{NodeIndex, Trie};
pub use self::trie_node::{NodeKind, TrieNode};
