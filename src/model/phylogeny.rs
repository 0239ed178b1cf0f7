//! Phylogeny tables: flat `{id, ancestor_id, origin_time, ...}` rows.
//!
//! A [PhylogenyTable] is the exported form of a reconstructed trie. Rows are
//! linked by `ancestor_id`; a root row points at itself. Table-level
//! transforms (unifurcation collapse, trunk handling, id canonicalisation)
//! operate on ids only, so they work on single exports and on concatenations
//! of many slices alike.

use crate::error::{HstratError, Result};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

// =#========================================================================#=
// VALUE
// =#========================================================================#=
/// A single cell of a user column forwarded onto leaf rows.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    U64(u64),
    U32(u32),
    I64(i64),
    F64(f64),
    Str(String),
}

// =#========================================================================#=
// PHYLOGENY ROW
// =#========================================================================#=
/// One node of an exported phylogeny.
///
/// `origin_time` is the floor of the trie's real-valued origin time.
/// `rank` and `differentia` are absent for the synthetic root; leaves report
/// their parent's allele. `extras` holds user columns forwarded onto leaves.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhylogenyRow {
    pub id: u64,
    pub ancestor_id: u64,
    pub origin_time: Option<i64>,
    pub destruction_time: Option<f64>,
    pub taxon_label: Option<String>,
    pub rank: Option<u64>,
    pub differentia: Option<u64>,
    pub data_id: Option<u64>,
    pub extras: BTreeMap<String, Value>,
}

impl PhylogenyRow {
    /// Creates a row with only its links set.
    pub fn new(id: u64, ancestor_id: u64) -> Self {
        PhylogenyRow {
            id,
            ancestor_id,
            origin_time: None,
            destruction_time: None,
            taxon_label: None,
            rank: None,
            differentia: None,
            data_id: None,
            extras: BTreeMap::new(),
        }
    }

    /// Returns `true` if this row is a root (`ancestor_id == id`).
    pub fn is_root(&self) -> bool {
        self.ancestor_id == self.id
    }
}

/// Which single-child rows [PhylogenyTable::collapse_unifurcations] removes.
///
/// Only unlabeled rows are ever removed, so the taxon-label set is preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnifurcationCollapse {
    /// Remove nothing.
    Keep,
    /// Remove non-root rows whose only child is a leaf; the leaf stands in
    /// for the allele its parent originated.
    #[default]
    SoleLeafParents,
    /// Remove every row with exactly one child, roots included; a removed
    /// root hands its root status to its child.
    All,
}

// =#========================================================================#=
// PHYLOGENY TABLE
// =#========================================================================#=
/// Owned buffer of [PhylogenyRow]s.
///
/// After [assign_contiguous_ids](Self::assign_contiguous_ids) the table is
/// canonical: `rows[i].id == i` and every non-root row has
/// `ancestor_id < id`.
///
/// # Example
/// ```
/// use hstrat::model::{PhylogenyRow, PhylogenyTable, UnifurcationCollapse};
///
/// let mut table = PhylogenyTable::new(vec![
///     PhylogenyRow::new(5, 5),
///     PhylogenyRow::new(7, 5),
///     PhylogenyRow::new(9, 7),
/// ]);
/// table.rows_mut()[2].taxon_label = Some("a".to_string());
///
/// table.collapse_unifurcations(UnifurcationCollapse::SoleLeafParents).unwrap();
/// table.assign_contiguous_ids().unwrap();
///
/// assert_eq!(table.len(), 2);
/// assert_eq!(table.rows()[1].ancestor_id, 0);
/// assert!(table.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhylogenyTable {
    rows: Vec<PhylogenyRow>,
}

// ============================================================================
// New, Getters, etc. (pub)
// ============================================================================
impl PhylogenyTable {
    /// Creates a table from rows in any order.
    pub fn new(rows: Vec<PhylogenyRow>) -> Self {
        PhylogenyTable { rows }
    }

    /// Returns an empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the rows in storage order.
    pub fn rows(&self) -> &[PhylogenyRow] {
        &self.rows
    }

    /// Returns the rows for in-place editing.
    pub fn rows_mut(&mut self) -> &mut Vec<PhylogenyRow> {
        &mut self.rows
    }

    /// Consumes the table, returning its rows.
    pub fn into_rows(self) -> Vec<PhylogenyRow> {
        self.rows
    }

    /// Returns an iterator over the rows.
    pub fn iter(&self) -> std::slice::Iter<'_, PhylogenyRow> {
        self.rows.iter()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of root rows.
    pub fn num_roots(&self) -> usize {
        self.rows.iter().filter(|row| row.is_root()).count()
    }

    /// Returns, per id, how many rows name it as ancestor (roots excluded).
    pub fn children_counts(&self) -> HashMap<u64, usize> {
        let mut counts: HashMap<u64, usize> = HashMap::with_capacity(self.rows.len());
        for row in self.rows.iter().filter(|row| !row.is_root()) {
            *counts.entry(row.ancestor_id).or_default() += 1;
        }
        counts
    }

    /// Returns the ids of childless rows in storage order.
    pub fn leaf_ids(&self) -> Vec<u64> {
        let counts = self.children_counts();
        self.rows
            .iter()
            .filter(|row| !counts.contains_key(&row.id))
            .map(|row| row.id)
            .collect()
    }

    /// Returns the id one past the largest id in use (0 if empty).
    pub fn next_id(&self) -> u64 {
        self.rows.iter().map(|row| row.id + 1).max().unwrap_or(0)
    }

    /// Appends another table, shifting its ids past all ids in use here.
    pub fn extend_renumbered(&mut self, other: PhylogenyTable) {
        let offset = self.next_id();
        self.rows.extend(other.rows.into_iter().map(|mut row| {
            row.id += offset;
            row.ancestor_id += offset;
            row
        }));
    }
}

// ============================================================================
// Transforms (pub)
// ============================================================================
impl PhylogenyTable {
    /// Returns row positions in topological order: ancestors first, ties
    /// broken by smallest id.
    ///
    /// # Errors
    /// [HstratError::UnsatisfiableInvariant] on duplicate ids, dangling
    /// ancestors, or cycles.
    pub fn topological_order(&self) -> Result<Vec<usize>> {
        let positions = self.position_by_id()?;

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); self.rows.len()];
        let mut heap = BinaryHeap::new();
        for (position, row) in self.rows.iter().enumerate() {
            if row.is_root() {
                heap.push(Reverse((row.id, position)));
            } else {
                let ancestor = *positions.get(&row.ancestor_id).ok_or_else(|| {
                    HstratError::invariant(format!(
                        "row {} names missing ancestor {}",
                        row.id, row.ancestor_id
                    ))
                })?;
                children[ancestor].push(position);
            }
        }

        let mut order = Vec::with_capacity(self.rows.len());
        while let Some(Reverse((_, position))) = heap.pop() {
            order.push(position);
            for &child in &children[position] {
                heap.push(Reverse((self.rows[child].id, child)));
            }
        }

        if order.len() != self.rows.len() {
            return Err(HstratError::invariant(format!(
                "{} rows unreachable from any root (ancestry cycle)",
                self.rows.len() - order.len()
            )));
        }
        Ok(order)
    }

    /// Removes single-child rows according to `policy`, reattaching each
    /// removed row's child to the nearest kept ancestor.
    ///
    /// Labeled rows are never removed. Origin times are untouched, so
    /// monotonicity along root-to-leaf paths is preserved.
    ///
    /// # Errors
    /// As [topological_order](Self::topological_order).
    pub fn collapse_unifurcations(&mut self, policy: UnifurcationCollapse) -> Result<()> {
        self.collapse_unifurcations_except(policy, |_| false)
    }

    /// As [collapse_unifurcations](Self::collapse_unifurcations), but never
    /// removes rows matching `is_protected`.
    ///
    /// # Errors
    /// As [topological_order](Self::topological_order).
    pub fn collapse_unifurcations_except(
        &mut self,
        policy: UnifurcationCollapse,
        is_protected: impl Fn(&PhylogenyRow) -> bool,
    ) -> Result<()> {
        if policy == UnifurcationCollapse::Keep || self.rows.is_empty() {
            return Ok(());
        }

        let order = self.topological_order()?;
        let counts = self.children_counts();
        // Sole child per single-child row
        let mut sole_child: HashMap<u64, u64> = HashMap::new();
        for row in self.rows.iter().filter(|row| !row.is_root()) {
            if counts.get(&row.ancestor_id) == Some(&1) {
                sole_child.insert(row.ancestor_id, row.id);
            }
        }

        let removable = |row: &PhylogenyRow| -> bool {
            if row.taxon_label.is_some() || is_protected(row) {
                return false;
            }
            let Some(&child) = sole_child.get(&row.id) else {
                return false;
            };
            match policy {
                UnifurcationCollapse::Keep => false,
                UnifurcationCollapse::SoleLeafParents => !row.is_root() && !counts.contains_key(&child),
                UnifurcationCollapse::All => true,
            }
        };

        // Removed id -> its replacement ancestor (None when the removed row was a root)
        let mut replaced: HashMap<u64, Option<u64>> = HashMap::new();
        for &position in &order {
            let row = &self.rows[position];
            let ancestor = if row.is_root() {
                None
            } else {
                match replaced.get(&row.ancestor_id) {
                    Some(resolved) => *resolved,
                    None => Some(row.ancestor_id),
                }
            };

            if removable(row) {
                replaced.insert(row.id, ancestor);
            } else {
                let id = row.id;
                self.rows[position].ancestor_id = ancestor.unwrap_or(id);
            }
        }

        if !replaced.is_empty() {
            self.rows.retain(|row| !replaced.contains_key(&row.id));
        }
        Ok(())
    }

    /// Replaces rows matching `is_trunk` by one synthetic root at
    /// `root_rank`, adopting every non-trunk child of a trunk row.
    ///
    /// The synthetic root's origin time is `root_rank`, lowered to its
    /// earliest child's origin time if that is smaller. Nothing is added
    /// when no non-trunk row hangs off the trunk.
    ///
    /// # Example
    /// ```
    /// use hstrat::model::{PhylogenyRow, PhylogenyTable};
    ///
    /// let mut rows: Vec<PhylogenyRow> = [(0, 0, 0), (1, 0, 1), (2, 1, 2), (3, 1, 3)]
    ///     .into_iter()
    ///     .map(|(id, ancestor_id, rank)| {
    ///         let mut row = PhylogenyRow::new(id, ancestor_id);
    ///         row.rank = Some(rank);
    ///         row.origin_time = Some(rank as i64);
    ///         row
    ///     })
    ///     .collect();
    /// rows[3].taxon_label = Some("a".to_string());
    /// let mut table = PhylogenyTable::new(rows);
    ///
    /// table.delete_trunk(|row| row.rank.unwrap_or(0) < 2 && row.taxon_label.is_none(), 2);
    /// assert_eq!(table.num_roots(), 1);
    /// let root = table.iter().find(|row| row.is_root()).unwrap();
    /// assert_eq!((root.rank, root.origin_time), (Some(2), Some(2)));
    /// ```
    pub fn delete_trunk(&mut self, is_trunk: impl Fn(&PhylogenyRow) -> bool, root_rank: u64) {
        let trunk: HashSet<u64> = self.rows.iter().filter(|row| is_trunk(row)).map(|row| row.id).collect();
        if trunk.is_empty() {
            return;
        }
        self.rows.retain(|row| !trunk.contains(&row.id));

        let root_id = self.next_id().max(trunk.iter().max().map_or(0, |&id| id + 1));
        let mut origin_time = i64::try_from(root_rank).ok();
        let mut adopted = 0usize;
        for row in self.rows.iter_mut().filter(|row| !row.is_root() && trunk.contains(&row.ancestor_id)) {
            row.ancestor_id = root_id;
            origin_time = match (origin_time, row.origin_time) {
                (Some(root), Some(child)) => Some(root.min(child)),
                (root, _) => root,
            };
            adopted += 1;
        }
        if adopted == 0 {
            return;
        }

        let mut root = PhylogenyRow::new(root_id, root_id);
        root.rank = Some(root_rank);
        root.origin_time = origin_time;
        self.rows.push(root);
    }

    /// Merges rows matching `is_trunk` into a single chain: one row per
    /// distinct trunk rank, in rank order, below one merged root. Non-trunk
    /// children of a trunk row move to the chain row of the same rank.
    ///
    /// Each chain row keeps the smallest id of the rows it merges, and the
    /// earliest of their origin times, lowered further where needed to stay
    /// non-decreasing down the chain.
    ///
    /// # Errors
    /// [HstratError::UnsatisfiableInvariant] if a trunk row descends from a
    /// non-trunk row.
    pub fn collapse_trunk(&mut self, is_trunk: impl Fn(&PhylogenyRow) -> bool) -> Result<()> {
        let trunk: HashSet<u64> = self.rows.iter().filter(|row| is_trunk(row)).map(|row| row.id).collect();
        if trunk.is_empty() {
            return Ok(());
        }
        if let Some(row) = self
            .rows
            .iter()
            .find(|row| trunk.contains(&row.id) && !row.is_root() && !trunk.contains(&row.ancestor_id))
        {
            return Err(HstratError::invariant(format!(
                "trunk row {} descends from non-trunk row {}",
                row.id, row.ancestor_id
            )));
        }

        // Chain position: roots first (None), then ascending rank
        let key_of = |row: &PhylogenyRow| if row.is_root() { None } else { Some(row.rank.unwrap_or(0)) };
        let mut links: BTreeMap<Option<u64>, (u64, Option<i64>)> = BTreeMap::new();
        for row in self.rows.iter().filter(|row| trunk.contains(&row.id)) {
            let link = links.entry(key_of(row)).or_insert((row.id, row.origin_time));
            link.0 = link.0.min(row.id);
            link.1 = match (link.1, row.origin_time) {
                (Some(kept), Some(other)) => Some(kept.min(other)),
                (kept, other) => kept.or(other),
            };
        }
        let chain_id_of: HashMap<u64, u64> = self
            .rows
            .iter()
            .filter(|row| trunk.contains(&row.id))
            .map(|row| (row.id, links[&key_of(row)].0))
            .collect();

        // Origin times, clamped from the deepest link upwards
        let mut chain: Vec<(u64, Option<i64>)> = links.into_values().collect();
        let mut floor: Option<i64> = None;
        for link in chain.iter_mut().rev() {
            if let (Some(origin), Some(below)) = (link.1, floor) {
                link.1 = Some(origin.min(below));
            }
            floor = link.1.or(floor);
        }
        let chain_links: HashMap<u64, (u64, Option<i64>)> = chain
            .iter()
            .enumerate()
            .map(|(position, &(id, origin_time))| {
                let ancestor_id = if position == 0 { id } else { chain[position - 1].0 };
                (id, (ancestor_id, origin_time))
            })
            .collect();

        self.rows
            .retain(|row| !trunk.contains(&row.id) || chain_links.contains_key(&row.id));
        for row in &mut self.rows {
            if let Some(&(ancestor_id, origin_time)) = chain_links.get(&row.id) {
                row.ancestor_id = ancestor_id;
                row.origin_time = origin_time;
            } else if let Some(&chain_id) = chain_id_of.get(&row.ancestor_id) {
                row.ancestor_id = chain_id;
            }
        }
        Ok(())
    }

    /// Renumbers rows to `0..N` in topological order (ties by original id)
    /// and stores them in id order.
    ///
    /// # Errors
    /// As [topological_order](Self::topological_order).
    pub fn assign_contiguous_ids(&mut self) -> Result<()> {
        let order = self.topological_order()?;

        let new_ids: HashMap<u64, u64> = order
            .iter()
            .enumerate()
            .map(|(new_id, &position)| (self.rows[position].id, new_id as u64))
            .collect();

        let mut slots: Vec<Option<PhylogenyRow>> = std::mem::take(&mut self.rows).into_iter().map(Some).collect();
        let mut rows = Vec::with_capacity(slots.len());
        for &position in &order {
            if let Some(mut row) = slots[position].take() {
                row.id = new_ids[&row.id];
                row.ancestor_id = new_ids[&row.ancestor_id];
                rows.push(row);
            }
        }
        self.rows = rows;
        Ok(())
    }

    /// Checks canonical form and time consistency.
    ///
    /// Checks:
    /// - `rows[i].id == i`
    /// - `ancestor_id < id` for non-root rows
    /// - origin time non-decreasing from ancestor to descendant
    /// - destruction time not before origin time
    ///
    /// # Errors
    /// [HstratError::UnsatisfiableInvariant] naming the first violation.
    pub fn validate(&self) -> Result<()> {
        for (position, row) in self.rows.iter().enumerate() {
            if row.id != position as u64 {
                return Err(HstratError::invariant(format!(
                    "row at position {position} has id {}",
                    row.id
                )));
            }
            if row.ancestor_id > row.id {
                return Err(HstratError::invariant(format!(
                    "row {} has later ancestor {}",
                    row.id, row.ancestor_id
                )));
            }
            if !row.is_root() {
                let ancestor = &self.rows[row.ancestor_id as usize];
                if let (Some(before), Some(after)) = (ancestor.origin_time, row.origin_time) {
                    if before > after {
                        return Err(HstratError::invariant(format!(
                            "origin time decreases from row {} ({before}) to row {} ({after})",
                            ancestor.id, row.id
                        )));
                    }
                }
            }
            if let (Some(origin), Some(destruction)) = (row.origin_time, row.destruction_time) {
                if destruction < origin as f64 {
                    return Err(HstratError::invariant(format!(
                        "row {} destroyed at {destruction} before origin {origin}",
                        row.id
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Helpers (private)
// ============================================================================
impl PhylogenyTable {
    fn position_by_id(&self) -> Result<HashMap<u64, usize>> {
        let mut positions = HashMap::with_capacity(self.rows.len());
        for (position, row) in self.rows.iter().enumerate() {
            if positions.insert(row.id, position).is_some() {
                return Err(HstratError::invariant(format!("duplicate row id {}", row.id)));
            }
        }
        Ok(positions)
    }
}

impl<'a> IntoIterator for &'a PhylogenyTable {
    type Item = &'a PhylogenyRow;
    type IntoIter = std::slice::Iter<'a, PhylogenyRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

// =#========================================================================#=
// TESTS - TABLE TRANSFORMS
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, ancestor_id: u64, origin_time: i64) -> PhylogenyRow {
        let mut row = PhylogenyRow::new(id, ancestor_id);
        row.origin_time = Some(origin_time);
        row
    }

    fn leaf(id: u64, ancestor_id: u64, origin_time: i64, label: &str) -> PhylogenyRow {
        let mut row = row(id, ancestor_id, origin_time);
        row.taxon_label = Some(label.to_string());
        row
    }

    /// Unlabeled row whose origin time equals its rank.
    fn ranked(id: u64, ancestor_id: u64, rank: u64) -> PhylogenyRow {
        let mut row = row(id, ancestor_id, rank as i64);
        row.rank = Some(rank);
        row
    }

    #[test]
    fn test_topological_order_breaks_ties_by_id() {
        let table = PhylogenyTable::new(vec![row(9, 3, 2), row(3, 3, 0), row(4, 3, 1), row(1, 1, 0)]);
        let order: Vec<u64> = table
            .topological_order()
            .unwrap()
            .into_iter()
            .map(|p| table.rows()[p].id)
            .collect();
        assert_eq!(order, vec![1, 3, 4, 9]);
    }

    #[test]
    fn test_topological_order_detects_cycle() {
        let table = PhylogenyTable::new(vec![row(0, 0, 0), row(1, 2, 0), row(2, 1, 0)]);
        assert!(matches!(
            table.topological_order(),
            Err(HstratError::UnsatisfiableInvariant { .. })
        ));
    }

    #[test]
    fn test_collapse_all_removes_chain() {
        // 0 -> 1 -> 2 -> {3, 4}
        let mut table = PhylogenyTable::new(vec![
            row(0, 0, 0),
            row(1, 0, 1),
            row(2, 1, 2),
            leaf(3, 2, 3, "a"),
            leaf(4, 2, 3, "b"),
        ]);
        table.collapse_unifurcations(UnifurcationCollapse::All).unwrap();
        table.assign_contiguous_ids().unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.num_roots(), 1);
        assert_eq!(table.rows()[0].origin_time, Some(2));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_sole_leaf_parents_keeps_root_and_inner_chain() {
        let mut table = PhylogenyTable::new(vec![row(0, 0, 0), row(1, 0, 0), row(2, 1, 1), leaf(3, 2, 1, "a")]);
        table
            .collapse_unifurcations(UnifurcationCollapse::SoleLeafParents)
            .unwrap();
        let ids: Vec<u64> = table.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 3]);
        assert_eq!(table.rows()[2].ancestor_id, 1);
    }

    #[test]
    fn test_collapse_except_keeps_protected_chain() {
        // 0 -> 1 -> 2 -> 3 -> {4, 5}; rows 0 and 1 are protected
        let mut table = PhylogenyTable::new(vec![
            row(0, 0, 0),
            row(1, 0, 1),
            row(2, 1, 2),
            row(3, 2, 3),
            leaf(4, 3, 4, "a"),
            leaf(5, 3, 4, "b"),
        ]);
        table
            .collapse_unifurcations_except(UnifurcationCollapse::All, |r| r.id < 2)
            .unwrap();

        let pairs: Vec<(u64, u64)> = table.iter().map(|r| (r.id, r.ancestor_id)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 0), (3, 1), (4, 3), (5, 3)]);
    }

    #[test]
    fn test_delete_trunk_adds_synthetic_root() {
        // Two slices, each with trunk 0 -> 1; trunk is rank < 4
        let mut table = PhylogenyTable::new(vec![
            ranked(0, 0, 0),
            ranked(1, 0, 2),
            ranked(2, 1, 5),
            leaf(3, 1, 6, "a"),
            ranked(4, 4, 0),
            ranked(5, 4, 3),
            leaf(6, 5, 4, "b"),
        ]);
        table.delete_trunk(|r| r.taxon_label.is_none() && r.rank.unwrap_or(0) < 4, 4);

        assert_eq!(table.num_roots(), 1);
        let root = table.iter().find(|r| r.is_root()).unwrap();
        assert_eq!(root.id, 7);
        assert_eq!((root.rank, root.origin_time), (Some(4), Some(4)));
        assert!(table.iter().filter(|r| r.taxon_label.is_none()).all(|r| r.rank.unwrap() >= 4));
        let adopted: Vec<u64> = table.iter().filter(|r| r.ancestor_id == 7 && !r.is_root()).map(|r| r.id).collect();
        assert_eq!(adopted, vec![2, 3, 6]);

        table.assign_contiguous_ids().unwrap();
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_delete_trunk_root_not_after_children() {
        let mut table = PhylogenyTable::new(vec![ranked(0, 0, 0), leaf(1, 0, 5, "a")]);
        table.rows_mut()[1].origin_time = Some(1);
        table.delete_trunk(|r| r.id == 0, 4);

        let root = table.iter().find(|r| r.is_root()).unwrap();
        assert_eq!(root.origin_time, Some(1));
    }

    #[test]
    fn test_delete_trunk_without_trunk_is_noop() {
        let mut table = PhylogenyTable::new(vec![ranked(0, 0, 5), leaf(1, 0, 6, "a")]);
        let before = table.clone();
        table.delete_trunk(|r| r.rank.unwrap_or(0) < 4 && r.taxon_label.is_none(), 4);
        assert_eq!(table, before);
    }

    #[test]
    fn test_collapse_trunk_merges_slices_into_one_chain() {
        // Slice one: 0 -> 1 (rank 1) -> 2 (rank 2) -> a
        // Slice two: 5 -> 6 (rank 1) -> {7 (rank 2) -> b, c}
        let mut table = PhylogenyTable::new(vec![
            ranked(0, 0, 0),
            ranked(1, 0, 1),
            ranked(2, 1, 2),
            leaf(3, 2, 9, "a"),
            ranked(5, 5, 0),
            ranked(6, 5, 1),
            ranked(7, 6, 2),
            leaf(8, 7, 9, "b"),
            leaf(9, 6, 9, "c"),
        ]);
        table
            .collapse_trunk(|r| r.taxon_label.is_none() && r.rank.unwrap_or(0) < 4)
            .unwrap();

        let pairs: Vec<(u64, u64)> = table.iter().map(|r| (r.id, r.ancestor_id)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 0), (2, 1), (3, 2), (8, 2), (9, 1)]);
        table.assign_contiguous_ids().unwrap();
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_collapse_trunk_keeps_chain_monotone() {
        let mut table = PhylogenyTable::new(vec![
            ranked(0, 0, 0),
            ranked(1, 0, 1),
            leaf(2, 1, 9, "a"),
            ranked(3, 3, 0),
            ranked(4, 3, 1),
            leaf(5, 4, 9, "b"),
        ]);
        // Second slice assigned earlier times
        table.rows_mut()[3].origin_time = Some(-3);
        table.rows_mut()[4].origin_time = Some(-2);
        table.collapse_trunk(|r| r.taxon_label.is_none()).unwrap();

        let times: Vec<(u64, Option<i64>)> = table.iter().map(|r| (r.id, r.origin_time)).collect();
        assert_eq!(times, vec![(0, Some(-3)), (1, Some(-2)), (2, Some(9)), (5, Some(9))]);
    }

    #[test]
    fn test_collapse_trunk_rejects_trunk_below_non_trunk() {
        let mut table = PhylogenyTable::new(vec![ranked(0, 0, 5), ranked(1, 0, 1)]);
        assert!(matches!(
            table.collapse_trunk(|r| r.rank.unwrap_or(0) < 4),
            Err(HstratError::UnsatisfiableInvariant { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_decreasing_origin() {
        let table = PhylogenyTable::new(vec![row(0, 0, 3), row(1, 0, 2)]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_extend_renumbered_shifts_ids() {
        let mut table = PhylogenyTable::new(vec![row(0, 0, 0), row(1, 0, 0)]);
        table.extend_renumbered(PhylogenyTable::new(vec![row(0, 0, 0), row(1, 0, 0)]));
        let pairs: Vec<(u64, u64)> = table.iter().map(|r| (r.id, r.ancestor_id)).collect();
        assert_eq!(pairs, vec![(0, 0), (1, 0), (2, 2), (3, 2)]);
    }
}
