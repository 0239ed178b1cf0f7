//! Arena-backed trie over ranked fingerprint sequences.
//!
//! Provides core data structures for the reconstruction trie:
//! * [Trie] - Prefix tree whose root-to-leaf paths spell retained alleles
//! * [NodeIndex] as type used to index nodes in the trie
//! * [PreOrderIter] / [PostOrderIter] for recursion-free traversal

use crate::model::trie_node::{NodeKind, TrieNode};
use std::fmt;

/// Index of a node in a trie (arena).
pub type NodeIndex = usize;

/// Arena index of the root; the root is always created first.
const ROOT_INDEX: NodeIndex = 0;

// =#========================================================================#=
// TRIE
// =#========================================================================#=
/// A prefix tree over ranked fingerprint sequences, represented using the
/// arena pattern on [TrieNode].
///
/// Nodes are stored in a contiguous vector and referenced by [NodeIndex].
/// Parent links are plain indices, so the trie exclusively owns every node
/// and a [Clone] is a full, recursion-free deep copy.
///
/// # Structure
/// - Index `0` holds the unique root, with neither rank nor differentia.
/// - Inner nodes are keyed by `(rank, differentia)`; ranks strictly increase
///   along every root-to-leaf path.
/// - Leaves carry a taxon label and take rank and differentia from their parent.
/// - Children keep insertion order.
/// - Nodes are never removed; restructuring only moves and clones.
///
/// # Example
/// ```
/// use hstrat::model::Trie;
///
/// let mut trie = Trie::new();
/// let a = trie.add_inner(trie.root_index(), 0, 17);
/// let b = trie.add_inner(a, 2, 5);
/// trie.attach_leaf(b, "x".to_string());
///
/// assert_eq!(trie.num_leaves(), 1);
/// assert_eq!(trie.rank_of(b), Some(2));
/// assert!(trie.is_valid());
/// ```
#[derive(Debug, Clone)]
pub struct Trie {
    /// Nodes of this trie (arena pattern)
    nodes: Vec<TrieNode>,
}

// ============================================================================
// New, Getters / Accessors, etc. (pub)
// ============================================================================
impl Trie {
    /// Creates a new trie holding only the root.
    pub fn new() -> Self {
        Trie {
            nodes: vec![TrieNode::new(ROOT_INDEX, None, NodeKind::Root)],
        }
    }

    /// Creates a new trie with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(TrieNode::new(ROOT_INDEX, None, NodeKind::Root));
        Trie { nodes }
    }

    /// Returns the index of the root.
    pub fn root_index(&self) -> NodeIndex {
        ROOT_INDEX
    }

    /// Returns a reference to the root node.
    pub fn root(&self) -> &TrieNode {
        &self.nodes[ROOT_INDEX]
    }

    /// Adds an inner node for allele `(rank, differentia)` under `parent`.
    ///
    /// # Returns
    /// The index of the newly created node.
    ///
    /// # Panics
    /// Panics if `parent` is out of bounds or a leaf.
    pub fn add_inner(&mut self, parent: NodeIndex, rank: u64, differentia: u64) -> NodeIndex {
        self.push_node(parent, NodeKind::Inner { rank, differentia })
    }

    /// Attaches a leaf for an extant taxon under `parent`.
    ///
    /// # Returns
    /// The index of the newly created leaf.
    ///
    /// # Panics
    /// Panics if `parent` is out of bounds or a leaf.
    pub fn attach_leaf(&mut self, parent: NodeIndex, taxon_label: String) -> NodeIndex {
        self.push_node(parent, NodeKind::Leaf { taxon_label })
    }

    /// Creates a childless copy of `source` (kind, times, attributes) under
    /// `new_parent`.
    ///
    /// # Panics
    /// Panics if `source` is the root or `new_parent` is a leaf.
    pub fn clone_inner_under(&mut self, source: NodeIndex, new_parent: NodeIndex) -> NodeIndex {
        assert!(!self.nodes[source].is_root(), "Cannot clone the root");
        assert!(!self.nodes[new_parent].is_leaf(), "Cannot attach under a leaf");
        let index = self.nodes.len();
        let copy = self.nodes[source].detached_copy(index, new_parent);
        self.nodes.push(copy);
        self.nodes[new_parent].push_child(index);
        index
    }

    /// Moves `node` (with its subtree) to become the last child of `new_parent`.
    ///
    /// # Panics
    /// Panics if `node` is the root or `new_parent` is a leaf.
    pub fn reparent(&mut self, node: NodeIndex, new_parent: NodeIndex) {
        assert!(!self.nodes[node].is_root(), "Cannot reparent the root");
        assert!(!self.nodes[new_parent].is_leaf(), "Cannot attach under a leaf");
        if let Some(old_parent) = self.nodes[node].parent() {
            self.nodes[old_parent].remove_child(node);
        }
        self.nodes[node].set_parent(new_parent);
        self.nodes[new_parent].push_child(node);
    }

    /// Returns a reference to the node at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node(&self, index: NodeIndex) -> &TrieNode {
        &self[index]
    }

    /// Returns a mutable reference to the node at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node_mut(&mut self, index: NodeIndex) -> &mut TrieNode {
        &mut self.nodes[index]
    }

    /// Returns all nodes in arena order.
    pub fn nodes(&self) -> &[TrieNode] {
        &self.nodes
    }

    /// Returns the child indices of a node in insertion order.
    pub fn children(&self, index: NodeIndex) -> &[NodeIndex] {
        self.nodes[index].children()
    }

    /// Returns the parent of a node, `None` for the root.
    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.nodes[index].parent()
    }

    /// Returns an iterator over the inner children of a node.
    pub fn inner_children(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.children(index)
            .iter()
            .copied()
            .filter(|&child| self.nodes[child].is_inner())
    }

    /// Returns an iterator over the leaf children of a node.
    pub fn leaf_children(&self, index: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.children(index)
            .iter()
            .copied()
            .filter(|&child| self.nodes[child].is_leaf())
    }

    /// Returns the rank of a node; leaves report their parent's rank,
    /// the root (and leaves directly under it) report `None`.
    pub fn rank_of(&self, index: NodeIndex) -> Option<u64> {
        let node = &self.nodes[index];
        match node.kind() {
            NodeKind::Root => None,
            NodeKind::Inner { rank, .. } => Some(*rank),
            NodeKind::Leaf { .. } => node.parent().and_then(|parent| self.nodes[parent].own_rank()),
        }
    }

    /// Returns the differentia of a node; leaves report their parent's.
    pub fn differentia_of(&self, index: NodeIndex) -> Option<u64> {
        let node = &self.nodes[index];
        match node.kind() {
            NodeKind::Root => None,
            NodeKind::Inner { differentia, .. } => Some(*differentia),
            NodeKind::Leaf { .. } => node
                .parent()
                .and_then(|parent| self.nodes[parent].own_differentia()),
        }
    }

    /// Returns the smallest rank among a node's inner children.
    pub fn min_inner_child_rank(&self, index: NodeIndex) -> Option<u64> {
        self.inner_children(index)
            .filter_map(|child| self.nodes[child].own_rank())
            .min()
    }

    /// Returns the number of nodes, root included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Returns the number of inner (non-root, non-leaf) nodes.
    pub fn num_inner(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_inner()).count()
    }

    /// Returns the number of independent clades, i.e. children of the root.
    pub fn num_origins(&self) -> usize {
        self.root().children().len()
    }

    /// Returns `true` if the trie holds only its root.
    pub fn is_empty(&self) -> bool {
        self.root().children().is_empty()
    }

    /// Returns a structurally detached copy of this trie.
    pub fn deep_copy(&self) -> Self {
        self.clone()
    }

    /// Returns, for each node, the number of leaves in its subtree.
    pub fn leaf_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.nodes.len()];
        for node in self.post_order_iter() {
            let index = node.index();
            if node.is_leaf() {
                counts[index] = 1;
            } else {
                counts[index] = node.children().iter().map(|&child| counts[child]).sum();
            }
        }
        counts
    }

    /// Validates trie structure and index references.
    ///
    /// Checks:
    /// - Index 0 is the only root and has no parent
    /// - All node indices match their position in the arena
    /// - Parent and child links agree in both directions
    /// - Leaves have no children
    /// - Inner ranks strictly increase along every path
    /// - Every node is reachable from the root
    ///
    /// # Returns
    /// `true` if trie is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        if self.nodes.is_empty() || !self.nodes[ROOT_INDEX].is_root() {
            return false;
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if node.index() != index {
                return false;
            }

            if node.is_root() {
                if index != ROOT_INDEX || node.parent().is_some() {
                    return false;
                }
            } else {
                match node.parent() {
                    None => return false,
                    Some(parent) => {
                        if parent >= self.nodes.len() || !self.nodes[parent].children().contains(&index) {
                            return false;
                        }
                    }
                }
            }

            if node.is_leaf() && !node.children().is_empty() {
                return false;
            }

            for &child in node.children() {
                if child >= self.nodes.len() || self.nodes[child].parent() != Some(index) {
                    return false;
                }
                // Strictly increasing inner ranks along paths
                if let (Some(rank), Some(child_rank)) = (node.own_rank(), self.nodes[child].own_rank()) {
                    if child_rank <= rank {
                        return false;
                    }
                }
            }
        }

        self.pre_order_iter().count() == self.nodes.len()
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<NodeIndex> for Trie {
    type Output = TrieNode;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

impl std::ops::IndexMut<NodeIndex> for Trie {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl Trie {
    fn push_node(&mut self, parent: NodeIndex, kind: NodeKind) -> NodeIndex {
        assert!(!self.nodes[parent].is_leaf(), "Cannot attach under a leaf");
        let index = self.nodes.len();
        self.nodes.push(TrieNode::new(index, Some(parent), kind));
        self.nodes[parent].push_child(index);
        index
    }
}

// ============================================================================
// Printing
// ============================================================================
/// Renders the trie as an indented outline.
///
/// # Example Output
/// ```text
/// [0] Root
///   ├─ [1] Inner (rank 0, differentia 17)
///   │   └─ [2] Leaf "a"
///   └─ [3] Inner (rank 0, differentia 4)
/// ```
impl fmt::Display for Trie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // (index, prefix for children, connector)
        let mut stack: Vec<(NodeIndex, String, &str)> = vec![(ROOT_INDEX, String::new(), "")];

        while let Some((index, prefix, connector)) = stack.pop() {
            let node = &self.nodes[index];
            let lead = if connector.is_empty() { String::new() } else { format!("{prefix}{connector}") };
            match node.kind() {
                NodeKind::Root => writeln!(f, "{lead}[{index}] Root")?,
                NodeKind::Inner { rank, differentia } => {
                    writeln!(f, "{lead}[{index}] Inner (rank {rank}, differentia {differentia})")?
                }
                NodeKind::Leaf { taxon_label } => writeln!(f, "{lead}[{index}] Leaf \"{taxon_label}\"")?,
            }

            let child_prefix = match connector {
                "" => "  ".to_string(),
                "└─ " => format!("{prefix}    "),
                _ => format!("{prefix}│   "),
            };
            let children = node.children();
            // Reverse push so the first child prints first
            for (position, &child) in children.iter().enumerate().rev() {
                let child_connector = if position + 1 == children.len() { "└─ " } else { "├─ " };
                stack.push((child, child_prefix.clone(), child_connector));
            }
        }

        Ok(())
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
impl Trie {
    /// Returns an iterator over the trie in post-order (children before parents).
    ///
    /// Useful for aggregating data from leaves upward, e.g. leaf counts.
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over the trie in pre-order (parents before children).
    ///
    /// Children are visited in insertion order, so the order is deterministic.
    ///
    /// # Example
    /// ```
    /// use hstrat::model::Trie;
    ///
    /// let mut trie = Trie::new();
    /// let a = trie.add_inner(0, 0, 1);
    /// let b = trie.add_inner(0, 0, 2);
    /// trie.attach_leaf(a, "x".to_string());
    ///
    /// let order: Vec<_> = trie.pre_order_iter().map(|n| n.index()).collect();
    /// assert_eq!(order, vec![0, a, 3, b]);
    /// ```
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }
}

/// Iterator for post-order traversal (children before parents).
///
/// Uses an explicit stack, so arbitrarily deep tries are safe to traverse.
pub struct PostOrderIter<'a> {
    trie: &'a Trie,
    stack: Vec<(NodeIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(trie: &'a Trie) -> Self {
        PostOrderIter {
            trie,
            stack: vec![(ROOT_INDEX, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIter<'a> {
    type Item = &'a TrieNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let node = &self.trie[index];

            if children_visited || node.children().is_empty() {
                return Some(node);
            }

            self.stack.push((index, true));
            for &child in node.children().iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
///
/// Uses an explicit stack, so arbitrarily deep tries are safe to traverse.
pub struct PreOrderIter<'a> {
    trie: &'a Trie,
    stack: Vec<NodeIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(trie: &'a Trie) -> Self {
        PreOrderIter {
            trie,
            stack: vec![ROOT_INDEX],
        }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a TrieNode;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = &self.trie[index];
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
