//! End-to-end bulk reconstruction over an exploded annotation frame.

use crate::dataframe::frame::Frame;
use crate::error::{HstratError, Result};
use crate::model::annotation::{check_bitwidth, fits_bitwidth, p_differentia_collision};
use crate::model::{PhylogenyRow, PhylogenyTable, UnifurcationCollapse};
use crate::postprocess::{Nop, TriePostprocessor};
use crate::reconstruction::export::trie_to_phylogeny;
use crate::reconstruction::searchtable::{SENTINEL_DATA_ID, Searchtable, TaxonAlleles};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, info_span};

/// Default upper bound on exploded rows per slice.
pub const DEFAULT_EXPLODED_SLICE_SIZE: usize = 1_000_000;

/// Columns every input frame must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = ["data_id", "rank", "differentia", "differentia_bitwidth", "dstream_S"];

/// Optional input column overriding leaf origin times.
pub const ORIGIN_TIME_COLUMN: &str = "origin_time";

// =#========================================================================#=
// SURFACE BUILD TREE (builder)
// =#========================================================================#=
/// Configures and runs bulk reconstruction.
///
/// # Pipeline
/// 1. Check that `differentia_bitwidth` and `dstream_S` are global
/// 2. Check rows: ranks strictly increase per `data_id`, fingerprints fit
/// 3. Group rows by `data_id` and cut into slices of at most
///    `exploded_slice_size` rows without splitting a taxon
/// 4. Per slice, in parallel: build a searchtable, lower it to a trie,
///    apply the postprocessor, export rows
/// 5. Concatenate slices with fresh ids, collapsing non-trunk
///    unifurcations after every `collapse_unif_freq`-th slice
/// 6. Replace trunk rows (unlabeled, `rank < dstream_S`) by one root at
///    `rank = dstream_S`, or merge the slices' trunks into a single chain
/// 7. Collapse remaining non-trunk unifurcations, assign contiguous ids
///    and validate the table
///
/// Rows without an assigned origin time take their rank. Leaves take their
/// origin time from an input `origin_time` column when present, and carry
/// every other non-required input column (value of the taxon's first row).
///
/// # Example
/// ```
/// use hstrat::dataframe::{SurfaceBuildTree, explode_annotations};
/// use hstrat::model::Annotation;
///
/// let population = vec![
///     (0, Annotation::new(6, 8, vec![(0, 1), (1, 1), (4, 2), (5, 3)]).unwrap()),
///     (1, Annotation::new(6, 8, vec![(0, 1), (1, 1), (4, 2), (5, 4)]).unwrap()),
/// ];
/// let frame = explode_annotations(&population, 2)?;
///
/// let table = SurfaceBuildTree::new().with_exploded_slice_size(100).build(&frame)?;
/// assert_eq!(table.leaf_ids().len(), 2);
/// assert!(table.iter().all(|row| row.rank.unwrap_or(0) >= 2));
/// # Ok::<(), hstrat::HstratError>(())
/// ```
#[derive(Debug)]
pub struct SurfaceBuildTree {
    exploded_slice_size: usize,
    trie_postprocessor: Box<dyn TriePostprocessor>,
    delete_trunk: bool,
    collapse_unif_freq: u64,
}

impl Default for SurfaceBuildTree {
    fn default() -> Self {
        SurfaceBuildTree {
            exploded_slice_size: DEFAULT_EXPLODED_SLICE_SIZE,
            trie_postprocessor: Box::new(Nop),
            delete_trunk: true,
            collapse_unif_freq: 1,
        }
    }
}

impl SurfaceBuildTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of exploded rows per slice.
    pub fn with_exploded_slice_size(mut self, exploded_slice_size: usize) -> Self {
        self.exploded_slice_size = exploded_slice_size;
        self
    }

    /// Sets the postprocessor applied to each slice's trie.
    pub fn with_trie_postprocessor(mut self, trie_postprocessor: impl TriePostprocessor + 'static) -> Self {
        self.trie_postprocessor = Box::new(trie_postprocessor);
        self
    }

    /// `true` replaces trunk rows by one root at `rank = dstream_S`, `false`
    /// merges them into a single chain.
    pub fn with_delete_trunk(mut self, delete_trunk: bool) -> Self {
        self.delete_trunk = delete_trunk;
        self
    }

    /// Collapses unifurcations after every `freq`-th slice and at the end;
    /// `0` never collapses.
    pub fn with_collapse_unif_freq(mut self, collapse_unif_freq: u64) -> Self {
        self.collapse_unif_freq = collapse_unif_freq;
        self
    }

    /// Reconstructs the phylogeny of all taxa in `frame`.
    ///
    /// # Errors
    /// * [HstratError::MalformedAnnotation] for missing or mistyped required
    ///   columns and invalid rows
    /// * [HstratError::InvalidBitwidth] for unsupported bitwidths
    /// * [HstratError::InconsistentGlobals] if a global column varies
    /// * [HstratError::InvalidConfiguration] for a zero slice size
    /// * [HstratError::UnsatisfiableInvariant] if an input `origin_time`
    ///   places a leaf before its ancestor
    /// * errors of the configured postprocessor
    #[tracing::instrument(skip_all, fields(num_rows = frame.num_rows()))]
    pub fn build(&self, frame: &Frame) -> Result<PhylogenyTable> {
        if self.exploded_slice_size == 0 {
            return Err(HstratError::config("exploded_slice_size must be positive"));
        }

        let data_ids = frame.column_as_u64("data_id")?;
        let ranks = frame.column_as_u64("rank")?;
        let differentiae = frame.column_as_u64("differentia")?;
        let bitwidths = frame.column_as_u64("differentia_bitwidth")?;
        let dstream_ss = frame.column_as_u64("dstream_S")?;

        let (Some(bitwidth), Some(dstream_s)) = (
            global_value("differentia_bitwidth", &bitwidths)?,
            global_value("dstream_S", &dstream_ss)?,
        ) else {
            info!("empty input frame");
            return Ok(PhylogenyTable::empty());
        };
        let bitwidth = u32::try_from(bitwidth).map_err(|_| HstratError::InvalidBitwidth { bitwidth: u32::MAX })?;
        check_bitwidth(bitwidth)?;

        let (taxa, first_rows) = group_taxa(&data_ids, &ranks, &differentiae, bitwidth)?;
        let slices = slice_taxa(taxa, self.exploded_slice_size);
        info!(
            num_taxa = first_rows.len(),
            num_slices = slices.len(),
            bitwidth,
            dstream_s,
            "reconstructing from exploded frame"
        );

        let leaf_columns = LeafColumns::new(frame, first_rows);
        let p = p_differentia_collision(bitwidth);
        let slice_tables: Vec<PhylogenyTable> = slices
            .into_par_iter()
            .enumerate()
            .map(|(index, slice)| {
                let _span = info_span!("slice", index).entered();
                self.build_slice(&slice, dstream_s, p, &leaf_columns)
            })
            .collect::<Result<_>>()?;

        // Trunk rows survive unifurcation collapse until trunk handling
        let is_trunk = |row: &PhylogenyRow| row.taxon_label.is_none() && row.rank.unwrap_or(0) < dstream_s;
        let mut table = PhylogenyTable::empty();
        for (index, slice_table) in slice_tables.into_iter().enumerate() {
            table.extend_renumbered(slice_table);
            if self.collapse_unif_freq > 0 && (index as u64 + 1) % self.collapse_unif_freq == 0 {
                table.collapse_unifurcations_except(UnifurcationCollapse::All, is_trunk)?;
            }
        }

        if self.delete_trunk {
            table.delete_trunk(is_trunk, dstream_s);
        } else {
            table.collapse_trunk(is_trunk)?;
        }

        if self.collapse_unif_freq > 0 {
            table.collapse_unifurcations_except(UnifurcationCollapse::All, is_trunk)?;
        }
        table.assign_contiguous_ids()?;
        table.validate()?;

        info!(num_rows = table.len(), num_roots = table.num_roots(), "reconstructed phylogeny");
        Ok(table)
    }

    fn build_slice(
        &self,
        slice: &[TaxonAlleles],
        dstream_s: u64,
        p_differentia_collision: f64,
        leaf_columns: &LeafColumns<'_>,
    ) -> Result<PhylogenyTable> {
        let trie = Searchtable::from_taxa(slice)?.into_trie(Some(dstream_s))?;
        let trie = self
            .trie_postprocessor
            .apply(trie, p_differentia_collision, true, &mut |_| {})?;

        let mut table = trie_to_phylogeny(&trie, UnifurcationCollapse::Keep)?;
        for row in table.rows_mut() {
            if row.rank.is_none() {
                // Root sentinel
                row.rank = Some(0);
            }
            if row.origin_time.is_none() {
                row.origin_time = row.rank.and_then(|rank| i64::try_from(rank).ok());
            }
            if let Some(data_id) = row.data_id {
                leaf_columns.annotate(row, data_id);
            }
        }

        debug!(num_taxa = slice.len(), num_rows = table.len(), "built slice");
        Ok(table)
    }
}

/// Reconstructs with default settings and renders the result as a frame.
///
/// See [SurfaceBuildTree] for the pipeline and errors.
pub fn surface_build_tree(frame: &Frame) -> Result<Frame> {
    SurfaceBuildTree::new().build(frame).map(|table| table.to_frame())
}

// ============================================================================
// Helpers (private)
// ============================================================================
/// Returns the single value of a global column, `None` when empty.
fn global_value(name: &str, values: &[u64]) -> Result<Option<u64>> {
    let Some(&first) = values.first() else {
        return Ok(None);
    };
    match values.iter().find(|&&value| value != first) {
        Some(&other) => Err(HstratError::inconsistent_globals(name, first, other)),
        None => Ok(Some(first)),
    }
}

/// Groups rows by `data_id` in order of first appearance, validating each row.
///
/// Returns the taxa and, per `data_id`, the index of its first row.
fn group_taxa(
    data_ids: &[u64],
    ranks: &[u64],
    differentiae: &[u64],
    bitwidth: u32,
) -> Result<(Vec<TaxonAlleles>, HashMap<u64, usize>)> {
    let mut taxa: Vec<TaxonAlleles> = Vec::new();
    let mut position_of: HashMap<u64, usize> = HashMap::new();
    let mut first_rows: HashMap<u64, usize> = HashMap::new();

    for (row, ((&data_id, &rank), &differentia)) in data_ids.iter().zip(ranks).zip(differentiae).enumerate() {
        if data_id == SENTINEL_DATA_ID {
            return Err(HstratError::malformed(format!("row {row}: data_id {data_id} is reserved")));
        }
        if !fits_bitwidth(differentia, bitwidth) {
            return Err(HstratError::malformed(format!(
                "row {row}: differentia {differentia} exceeds {bitwidth} bits"
            )));
        }

        let position = *position_of.entry(data_id).or_insert_with(|| {
            first_rows.insert(data_id, row);
            taxa.push(TaxonAlleles {
                data_id,
                alleles: Vec::new(),
            });
            taxa.len() - 1
        });
        let alleles = &mut taxa[position].alleles;
        if alleles.last().is_some_and(|&(previous, _)| previous >= rank) {
            return Err(HstratError::malformed(format!(
                "row {row}: rank {rank} of data_id {data_id} not above its previous rank"
            )));
        }
        alleles.push((rank, differentia));
    }

    Ok((taxa, first_rows))
}

/// Cuts taxa into consecutive slices of at most `max_rows` alleles; a taxon
/// larger than `max_rows` gets a slice of its own.
fn slice_taxa(taxa: Vec<TaxonAlleles>, max_rows: usize) -> Vec<Vec<TaxonAlleles>> {
    let mut slices = Vec::new();
    let mut current: Vec<TaxonAlleles> = Vec::new();
    let mut current_rows = 0usize;

    for taxon in taxa {
        let rows = taxon.alleles.len();
        if !current.is_empty() && current_rows + rows > max_rows {
            slices.push(std::mem::take(&mut current));
            current_rows = 0;
        }
        current_rows += rows;
        current.push(taxon);
    }
    if !current.is_empty() {
        slices.push(current);
    }
    slices
}

/// Input columns copied onto leaf rows.
struct LeafColumns<'a> {
    frame: &'a Frame,
    first_rows: HashMap<u64, usize>,
    forwarded: Vec<&'a str>,
}

impl<'a> LeafColumns<'a> {
    fn new(frame: &'a Frame, first_rows: HashMap<u64, usize>) -> Self {
        let forwarded = frame
            .column_names()
            .filter(|name| !REQUIRED_COLUMNS.contains(name) && *name != ORIGIN_TIME_COLUMN)
            .collect();
        LeafColumns {
            frame,
            first_rows,
            forwarded,
        }
    }

    fn annotate(&self, row: &mut PhylogenyRow, data_id: u64) {
        let Some(&first_row) = self.first_rows.get(&data_id) else {
            return;
        };
        if let Some(origin_time) = self
            .frame
            .column(ORIGIN_TIME_COLUMN)
            .and_then(|column| column.value_as_i64(first_row))
        {
            row.origin_time = Some(origin_time);
        }
        for &name in &self.forwarded {
            if let Some(value) = self.frame.column(name).and_then(|column| column.value(first_row)) {
                row.extras.insert(name.to_string(), value);
            }
        }
    }
}

// =#========================================================================#=
// TESTS - SLICING
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;

    fn taxon(data_id: u64, num_alleles: u64) -> TaxonAlleles {
        TaxonAlleles {
            data_id,
            alleles: (0..num_alleles).map(|rank| (rank, 0)).collect(),
        }
    }

    #[test]
    fn test_slices_respect_taxon_boundaries() {
        let slices = slice_taxa(vec![taxon(0, 3), taxon(1, 3), taxon(2, 5), taxon(3, 1)], 6);
        let ids: Vec<Vec<u64>> = slices
            .iter()
            .map(|slice| slice.iter().map(|t| t.data_id).collect())
            .collect();
        assert_eq!(ids, vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_oversized_taxon_gets_own_slice() {
        let slices = slice_taxa(vec![taxon(0, 1), taxon(1, 9), taxon(2, 1)], 4);
        assert_eq!(slices.len(), 3);
    }

    #[test]
    fn test_global_value_detects_inconsistency() {
        assert_eq!(global_value("x", &[]).unwrap(), None);
        assert_eq!(global_value("x", &[3, 3]).unwrap(), Some(3));
        assert!(matches!(
            global_value("x", &[3, 4]),
            Err(HstratError::InconsistentGlobals { first: 3, other: 4, .. })
        ));
    }

    #[test]
    fn test_group_taxa_rejects_descending_ranks() {
        let result = group_taxa(&[1, 1], &[2, 1], &[0, 0], 8);
        assert!(matches!(result, Err(HstratError::MalformedAnnotation { .. })));
    }

    #[test]
    fn test_group_taxa_interleaved_rows() {
        let (taxa, first_rows) = group_taxa(&[5, 6, 5], &[0, 0, 1], &[1, 2, 3], 8).unwrap();
        assert_eq!(taxa.len(), 2);
        assert_eq!(taxa[0].alleles, vec![(0, 1), (1, 3)]);
        assert_eq!(first_rows[&6], 1);
    }
}
