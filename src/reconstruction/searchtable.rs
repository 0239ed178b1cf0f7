//! Searchtable trie builder for bulk ingestion.
//!
//! The trie is kept as a flat vector of [SearchRecord]s addressed by `u32`
//! indices. Every record stores its true `ancestor_id` plus three links of an
//! *overlay search tree* (child-first / next-sibling layout) used only to
//! find the node an incoming allele should attach to:
//!
//! ```text
//! record:  ancestor_id | search_ancestor_id | search_first_child_id | search_next_sibling_id
//! ```
//!
//! A link equal to the record's own index means "none". Record 0 is the root
//! sentinel. Search children are chained in descending rank order.
//!
//! Taxa are inserted in ascending order of their deepest retained rank, so a
//! later taxon has usually thinned out its ancient strata further and no longer
//! retains some ranks an earlier one did; before matching at `rank`,
//! search children at ranks *below* `rank` are dissolved from the overlay
//! (their own search children are lifted), so the taxon can match deeper
//! alleles it does retain. Records are never deleted: the lowered trie
//! follows `ancestor_id`, not the overlay.

use crate::error::{HstratError, Result};
use crate::model::{NodeIndex, Trie};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Record index type.
pub type RecordIndex = u32;

/// `data_id` of records that are not taxon leaves.
pub const SENTINEL_DATA_ID: u64 = u64::MAX;

/// Differentia stored on taxon leaf records.
pub const SENTINEL_DIFFERENTIA: u64 = u64::MAX;

/// Node attribute holding a leaf's `data_id` in lowered tries.
pub const DATA_ID_ATTRIBUTE: &str = "data_id";

/// Node attribute holding the annotation buffer capacity in lowered tries.
pub const DSTREAM_S_ATTRIBUTE: &str = "dstream_S";

const ROOT_RECORD: RecordIndex = 0;

// =#========================================================================#=
// SEARCH RECORD
// =#========================================================================#=
/// One trie node in the searchtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub ancestor_id: RecordIndex,
    pub search_ancestor_id: RecordIndex,
    pub search_first_child_id: RecordIndex,
    pub search_next_sibling_id: RecordIndex,
    pub rank: u64,
    pub differentia: u64,
    pub data_id: u64,
}

impl SearchRecord {
    fn detached(id: RecordIndex, ancestor_id: RecordIndex, rank: u64, differentia: u64, data_id: u64) -> Self {
        SearchRecord {
            ancestor_id,
            search_ancestor_id: id,
            search_first_child_id: id,
            search_next_sibling_id: id,
            rank,
            differentia,
            data_id,
        }
    }

    /// Returns `true` for taxon leaf records.
    pub fn is_leaf(&self) -> bool {
        self.data_id != SENTINEL_DATA_ID
    }
}

/// Retained alleles of one taxon, as gathered from exploded rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonAlleles {
    pub data_id: u64,
    /// `(rank, differentia)` pairs in ascending rank order
    pub alleles: Vec<(u64, u64)>,
}

impl TaxonAlleles {
    /// Deepest retained rank, 0 without alleles.
    pub fn max_rank(&self) -> u64 {
        self.alleles.last().map(|&(rank, _)| rank).unwrap_or(0)
    }
}

// =#========================================================================#=
// SEARCHTABLE
// =#========================================================================#=
/// Flat, index-linked trie with a search overlay.
///
/// # Example
/// ```
/// use hstrat::reconstruction::searchtable::Searchtable;
///
/// let mut table = Searchtable::new();
/// table.insert_artifact(&[(0, 7), (2, 1)], 10).unwrap();
/// table.insert_artifact(&[(0, 7), (2, 1)], 11).unwrap();
///
/// // root, (0,7), (2,1), two leaves
/// assert_eq!(table.len(), 5);
/// let trie = table.into_trie(None).unwrap();
/// assert_eq!(trie.num_leaves(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Searchtable {
    records: Vec<SearchRecord>,
}

// ============================================================================
// New, Getters (pub)
// ============================================================================
impl Searchtable {
    /// Creates a searchtable holding only the root sentinel.
    pub fn new() -> Self {
        Searchtable {
            records: vec![SearchRecord::detached(ROOT_RECORD, ROOT_RECORD, 0, 0, SENTINEL_DATA_ID)],
        }
    }

    /// Builds a searchtable from taxa, inserting them in ascending order of
    /// their deepest retained rank (ties keep the given order).
    ///
    /// # Errors
    /// As [insert_artifact](Self::insert_artifact).
    pub fn from_taxa(taxa: &[TaxonAlleles]) -> Result<Self> {
        let mut order: Vec<&TaxonAlleles> = taxa.iter().collect();
        order.sort_by_key(|taxon| taxon.max_rank());

        let mut table = Searchtable::new();
        for taxon in order {
            table.insert_artifact(&taxon.alleles, taxon.data_id)?;
        }
        debug!(num_taxa = taxa.len(), num_records = table.len(), "built searchtable");
        Ok(table)
    }

    /// Returns the number of records, root sentinel included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if only the root sentinel exists.
    pub fn is_empty(&self) -> bool {
        self.records.len() == 1
    }

    /// Returns all records in creation order.
    pub fn records(&self) -> &[SearchRecord] {
        &self.records
    }

    /// Returns the record at `id`.
    pub fn record(&self, id: RecordIndex) -> &SearchRecord {
        &self.records[id as usize]
    }

    /// Returns the search children of `parent` in chain (descending rank) order.
    pub fn search_children(&self, parent: RecordIndex) -> Vec<RecordIndex> {
        let mut children = Vec::new();
        let mut current = self.record(parent).search_first_child_id;
        if current == parent {
            return children;
        }
        loop {
            children.push(current);
            let next = self.record(current).search_next_sibling_id;
            if next == current {
                break;
            }
            current = next;
        }
        children
    }
}

impl Default for Searchtable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Overlay primitives (pub)
// ============================================================================
impl Searchtable {
    /// Appends a record under `parent` and links it into the search overlay.
    ///
    /// # Errors
    /// [HstratError::InvalidConfiguration] if record indices would overflow `u32`.
    pub fn create_offspring(
        &mut self,
        parent: RecordIndex,
        differentia: u64,
        rank: u64,
        data_id: u64,
    ) -> Result<RecordIndex> {
        let id = RecordIndex::try_from(self.records.len())
            .ok()
            .filter(|&id| id < RecordIndex::MAX)
            .ok_or_else(|| HstratError::config("searchtable exceeds u32 record capacity; use smaller slices"))?;

        self.records
            .push(SearchRecord::detached(id, parent, rank, differentia, data_id));
        self.attach_search_parent(id, parent);
        Ok(id)
    }

    /// Links `child` into `parent`'s search chain, keeping ranks descending.
    /// Among equal ranks the newcomer goes last.
    pub fn attach_search_parent(&mut self, child: RecordIndex, parent: RecordIndex) {
        let rank = self.record(child).rank;

        let mut previous: Option<RecordIndex> = None;
        let mut next: Option<RecordIndex> = self.first_search_child(parent);
        while let Some(sibling) = next {
            if self.record(sibling).rank < rank {
                break;
            }
            previous = Some(sibling);
            next = self.next_search_sibling(sibling);
        }

        let child_record = &mut self.records[child as usize];
        child_record.search_ancestor_id = parent;
        child_record.search_next_sibling_id = next.unwrap_or(child);
        match previous {
            None => self.records[parent as usize].search_first_child_id = child,
            Some(previous) => self.records[previous as usize].search_next_sibling_id = child,
        }
    }

    /// Unlinks `child` from its search parent and resets its ancestor and
    /// sibling links to itself. Its own search children stay attached.
    /// Detaching an already detached record does nothing.
    pub fn detach_search_parent(&mut self, child: RecordIndex) {
        let parent = self.record(child).search_ancestor_id;
        if parent == child {
            return;
        }
        let following = self.next_search_sibling(child);

        if self.record(parent).search_first_child_id == child {
            self.records[parent as usize].search_first_child_id = following.unwrap_or(parent);
        } else {
            let mut current = self.record(parent).search_first_child_id;
            while let Some(next) = self.next_search_sibling(current) {
                if next == child {
                    self.records[current as usize].search_next_sibling_id = following.unwrap_or(current);
                    break;
                }
                current = next;
            }
        }

        let record = &mut self.records[child as usize];
        record.search_ancestor_id = child;
        record.search_next_sibling_id = child;
    }

    /// Returns the inner search child of `parent` originating
    /// `(rank, differentia)`, creating it if absent.
    ///
    /// # Errors
    /// As [create_offspring](Self::create_offspring).
    pub fn place_allele(&mut self, parent: RecordIndex, rank: u64, differentia: u64) -> Result<RecordIndex> {
        let mut next = self.first_search_child(parent);
        while let Some(child) = next {
            let record = self.record(child);
            if record.rank < rank {
                break;
            }
            if !record.is_leaf() && record.rank == rank && record.differentia == differentia {
                return Ok(child);
            }
            next = self.next_search_sibling(child);
        }
        self.create_offspring(parent, differentia, rank, SENTINEL_DATA_ID)
    }

    /// Dissolves `node`'s inner search children ranked below `rank`, lifting
    /// their search children onto `node` until none remain, then merges
    /// indistinguishable siblings.
    pub fn consolidate_trie(&mut self, node: RecordIndex, rank: u64) {
        loop {
            let dissolved: Vec<RecordIndex> = self
                .search_children(node)
                .into_iter()
                .filter(|&child| !self.record(child).is_leaf() && self.record(child).rank < rank)
                .collect();
            if dissolved.is_empty() {
                break;
            }

            for child in dissolved {
                trace!(node, dissolved = child, "dissolving search child");
                self.detach_search_parent(child);
                for grandchild in self.search_children(child) {
                    self.detach_search_parent(grandchild);
                    self.attach_search_parent(grandchild, node);
                }
            }
        }

        self.collapse_indistinguishable_nodes(node);
    }

    /// Merges inner search children sharing `(rank, differentia)` into the
    /// lowest-id one, moving the losers' search children onto it. Merged
    /// winners are collapsed in turn.
    pub fn collapse_indistinguishable_nodes(&mut self, node: RecordIndex) {
        let mut worklist = vec![node];
        while let Some(current) = worklist.pop() {
            let mut groups: HashMap<(u64, u64), Vec<RecordIndex>> = HashMap::new();
            for child in self.search_children(current) {
                let record = self.record(child);
                if !record.is_leaf() {
                    groups
                        .entry((record.rank, record.differentia))
                        .or_default()
                        .push(child);
                }
            }

            let mut merged_winners: Vec<RecordIndex> = Vec::new();
            for mut group in groups.into_values().filter(|group| group.len() > 1) {
                group.sort_unstable();
                let winner = group[0];
                for &loser in &group[1..] {
                    for grandchild in self.search_children(loser) {
                        self.detach_search_parent(grandchild);
                        self.attach_search_parent(grandchild, winner);
                    }
                    self.detach_search_parent(loser);
                }
                merged_winners.push(winner);
            }

            merged_winners.sort_unstable();
            worklist.extend(merged_winners.into_iter().rev());
        }
    }

    /// Inserts one taxon: walks its alleles from the root, consolidating and
    /// placing each, then records a leaf carrying `data_id`.
    ///
    /// # Returns
    /// The index of the leaf record.
    ///
    /// # Errors
    /// * [HstratError::MalformedAnnotation] if ranks are not strictly
    ///   increasing or `data_id` is the reserved sentinel
    /// * As [create_offspring](Self::create_offspring)
    pub fn insert_artifact(&mut self, alleles: &[(u64, u64)], data_id: u64) -> Result<RecordIndex> {
        if data_id == SENTINEL_DATA_ID {
            return Err(HstratError::malformed(format!("data_id {data_id} is reserved")));
        }
        if let Some(window) = alleles.windows(2).find(|window| window[0].0 >= window[1].0) {
            return Err(HstratError::malformed(format!(
                "ranks not strictly increasing for data_id {data_id} at rank {}",
                window[1].0
            )));
        }

        let mut current = ROOT_RECORD;
        let mut final_rank = 0;
        for &(rank, differentia) in alleles {
            if self.has_inner_search_child_below(current, rank) {
                self.consolidate_trie(current, rank);
            }
            current = self.place_allele(current, rank, differentia)?;
            final_rank = rank;
        }

        self.create_offspring(current, SENTINEL_DIFFERENTIA, final_rank, data_id)
    }

    /// Lowers the records into a [Trie] following `ancestor_id` links.
    ///
    /// Inner records become inner nodes; leaf records become leaves labelled
    /// with their `data_id`, which is also stored as the `data_id` attribute.
    /// With `dstream_s` set, every node carries it as the `dstream_S`
    /// attribute.
    ///
    /// # Errors
    /// [HstratError::UnsatisfiableInvariant] if a record precedes its ancestor
    /// or hangs off a leaf.
    pub fn into_trie(self, dstream_s: Option<u64>) -> Result<Trie> {
        let mut trie = Trie::with_capacity(self.records.len());
        let mut node_of: Vec<NodeIndex> = Vec::with_capacity(self.records.len());
        node_of.push(trie.root_index());

        for (id, record) in self.records.iter().enumerate().skip(1) {
            let ancestor = record.ancestor_id as usize;
            if ancestor >= id || self.records[ancestor].is_leaf() {
                return Err(HstratError::invariant(format!(
                    "record {id} has invalid ancestor {ancestor}"
                )));
            }
            let parent = node_of[ancestor];
            let index = if record.is_leaf() {
                let index = trie.attach_leaf(parent, record.data_id.to_string());
                trie[index].set_attribute(DATA_ID_ATTRIBUTE, record.data_id);
                index
            } else {
                trie.add_inner(parent, record.rank, record.differentia)
            };
            node_of.push(index);
        }

        if let Some(dstream_s) = dstream_s {
            for index in 0..trie.num_nodes() {
                trie[index].set_attribute(DSTREAM_S_ATTRIBUTE, dstream_s);
            }
        }
        Ok(trie)
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl Searchtable {
    fn first_search_child(&self, parent: RecordIndex) -> Option<RecordIndex> {
        let first = self.record(parent).search_first_child_id;
        (first != parent).then_some(first)
    }

    fn next_search_sibling(&self, child: RecordIndex) -> Option<RecordIndex> {
        let next = self.record(child).search_next_sibling_id;
        (next != child).then_some(next)
    }

    fn has_inner_search_child_below(&self, node: RecordIndex, rank: u64) -> bool {
        let mut next = self.first_search_child(node);
        while let Some(child) = next {
            let record = self.record(child);
            if !record.is_leaf() && record.rank < rank {
                return true;
            }
            next = self.next_search_sibling(child);
        }
        false
    }
}
