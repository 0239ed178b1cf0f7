//! Lowering of a postprocessed trie into a [PhylogenyTable].

use crate::error::Result;
use crate::model::{NodeIndex, PhylogenyRow, PhylogenyTable, Trie, UnifurcationCollapse};
use crate::reconstruction::searchtable::DATA_ID_ATTRIBUTE;

/// Converts a trie into phylogeny rows.
///
/// Nodes receive ids in pre-order (root = 0, a root row is its own ancestor)
/// and carry their origin time (floored), destruction time, taxon label,
/// rank, differentia and `data_id` attribute. Unifurcations are then
/// collapsed according to `collapse`; ids are left as assigned, so call
/// [PhylogenyTable::assign_contiguous_ids] afterwards if rows were removed.
///
/// A trie holding only its root yields an empty table.
///
/// # Errors
/// As [PhylogenyTable::collapse_unifurcations].
///
/// # Example
/// ```
/// use hstrat::model::{Trie, UnifurcationCollapse};
/// use hstrat::reconstruction::trie_to_phylogeny;
///
/// let mut trie = Trie::new();
/// let a = trie.add_inner(0, 0, 3);
/// trie.attach_leaf(a, "x".to_string());
///
/// let table = trie_to_phylogeny(&trie, UnifurcationCollapse::Keep).unwrap();
/// assert_eq!(table.len(), 3);
/// assert_eq!(table.rows()[2].taxon_label.as_deref(), Some("x"));
/// ```
pub fn trie_to_phylogeny(trie: &Trie, collapse: UnifurcationCollapse) -> Result<PhylogenyTable> {
    if trie.is_empty() {
        return Ok(PhylogenyTable::empty());
    }

    let mut ids: Vec<u64> = vec![0; trie.num_nodes()];
    let mut rows = Vec::with_capacity(trie.num_nodes());
    for (id, node) in trie.pre_order_iter().enumerate() {
        let index: NodeIndex = node.index();
        let id = id as u64;
        ids[index] = id;

        let ancestor_id = node.parent().map_or(id, |parent| ids[parent]);
        let mut row = PhylogenyRow::new(id, ancestor_id);
        row.origin_time = node.origin_time().map(|time| time.floor() as i64);
        row.destruction_time = node.destruction_time();
        row.taxon_label = node.taxon_label().map(str::to_string);
        row.rank = trie.rank_of(index);
        row.differentia = trie.differentia_of(index);
        row.data_id = node.attribute(DATA_ID_ATTRIBUTE);
        rows.push(row);
    }

    let mut table = PhylogenyTable::new(rows);
    table.collapse_unifurcations(collapse)?;
    Ok(table)
}
