//! Node type for the reconstruction trie.

use crate::model::trie::NodeIndex;
use std::collections::BTreeMap;

// =#========================================================================#=
// NODE KIND
// =#========================================================================#=
/// Role of a node in the trie.
///
/// - **Root**: unique synthetic origin; no rank, no differentia
/// - **Inner**: origination of the allele `(rank, differentia)`
/// - **Leaf**: extant taxon; implied rank and differentia are its parent's
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum NodeKind {
    /// Synthetic root of the trie
    Root,
    /// Allele origination
    Inner {
        /// Deposition rank of the allele
        rank: u64,
        /// Fingerprint value of the allele
        differentia: u64,
    },
    /// Extant taxon
    Leaf {
        /// Label of the taxon
        taxon_label: String,
    },
}

// =#========================================================================#=
// TRIE NODE
// =#========================================================================#=
/// A node of a [Trie](crate::model::Trie), stored in the trie's arena.
///
/// # Invariants
/// - `index` is the node's position in the arena
/// - only the root lacks a parent
/// - leaves have no children
/// - times are unset until a postprocessor assigns them
#[derive(PartialEq, Debug, Clone)]
pub struct TrieNode {
    index: NodeIndex,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
    kind: NodeKind,
    origin_time: Option<f64>,
    destruction_time: Option<f64>,
    attributes: BTreeMap<String, u64>,
}

impl TrieNode {
    pub(crate) fn new(index: NodeIndex, parent: Option<NodeIndex>, kind: NodeKind) -> Self {
        TrieNode {
            index,
            parent,
            children: Vec::new(),
            kind,
            origin_time: None,
            destruction_time: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Returns the index of this node.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Returns the kind of this node.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Returns the index of the parent, or `None` for the root.
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    /// Returns child indices in insertion order.
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Returns `true` if this node is the root.
    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    /// Returns `true` if this node is an inner (non-root, non-leaf) node.
    pub fn is_inner(&self) -> bool {
        matches!(self.kind, NodeKind::Inner { .. })
    }

    /// Returns `true` if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Returns the rank stored on this node; `None` for root and leaves.
    ///
    /// Use [Trie::rank_of](crate::model::Trie::rank_of) to resolve a leaf's
    /// implied rank.
    pub fn own_rank(&self) -> Option<u64> {
        match self.kind {
            NodeKind::Inner { rank, .. } => Some(rank),
            _ => None,
        }
    }

    /// Returns the differentia stored on this node; `None` for root and leaves.
    pub fn own_differentia(&self) -> Option<u64> {
        match self.kind {
            NodeKind::Inner { differentia, .. } => Some(differentia),
            _ => None,
        }
    }

    /// Returns the taxon label if this is a leaf, else `None`.
    pub fn taxon_label(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Leaf { taxon_label } => Some(taxon_label),
            _ => None,
        }
    }

    /// Returns whether this inner node originates the allele `(rank, differentia)`.
    ///
    /// Always `false` for the root and leaves.
    pub fn is_an_origination_of_allele(&self, rank: u64, differentia: u64) -> bool {
        matches!(
            self.kind,
            NodeKind::Inner { rank: r, differentia: d } if r == rank && d == differentia
        )
    }

    /// Returns the assigned origin time, if any.
    pub fn origin_time(&self) -> Option<f64> {
        self.origin_time
    }

    /// Sets the origin time.
    pub fn set_origin_time(&mut self, origin_time: f64) {
        self.origin_time = Some(origin_time);
    }

    /// Returns the assigned destruction time, if any.
    pub fn destruction_time(&self) -> Option<f64> {
        self.destruction_time
    }

    /// Sets the destruction time.
    pub fn set_destruction_time(&mut self, destruction_time: f64) {
        self.destruction_time = Some(destruction_time);
    }

    /// Returns a named per-node attribute.
    pub fn attribute(&self, name: &str) -> Option<u64> {
        self.attributes.get(name).copied()
    }

    /// Returns all per-node attributes.
    pub fn attributes(&self) -> &BTreeMap<String, u64> {
        &self.attributes
    }

    /// Sets a named per-node attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: u64) {
        self.attributes.insert(name.into(), value);
    }

    // Structural mutation stays with the trie, which keeps both link directions in sync
    pub(crate) fn set_parent(&mut self, parent: NodeIndex) {
        self.parent = Some(parent);
    }

    pub(crate) fn push_child(&mut self, child: NodeIndex) {
        self.children.push(child);
    }

    pub(crate) fn remove_child(&mut self, child: NodeIndex) -> bool {
        match self.children.iter().position(|&c| c == child) {
            Some(position) => {
                self.children.remove(position);
                true
            }
            None => false,
        }
    }

    /// Copies kind, times, and attributes into a childless node at `index`.
    pub(crate) fn detached_copy(&self, index: NodeIndex, parent: NodeIndex) -> Self {
        TrieNode {
            index,
            parent: Some(parent),
            children: Vec::new(),
            kind: self.kind.clone(),
            origin_time: self.origin_time,
            destruction_time: self.destruction_time,
            attributes: self.attributes.clone(),
        }
    }
}
