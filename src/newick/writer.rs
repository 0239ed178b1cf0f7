//! Newick serialization of [PhylogenyTable]s.

use crate::error::Result;
use crate::model::{PhylogenyRow, PhylogenyTable};
use crate::newick::escape::escape_label;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};

/// Estimated characters per row, used to pre-size output strings.
const CHARS_PER_ROW: usize = 8;

/// Writes every tree of `table` to a file in Newick format, one tree per line.
///
/// # Arguments
/// * `file` - The file to write to
/// * `table` - Phylogeny to write; each root starts a separate tree
///
/// # Errors
/// * [HstratError::Io](crate::HstratError::Io) if writing fails
/// * As [to_newick]
///
/// # Example
/// ```ignore
/// use hstrat::newick::write_newick_file;
/// use std::fs::File;
///
/// let file = File::create("reconstruction.nwk")?;
/// write_newick_file(file, &table)?;
/// ```
pub fn write_newick_file(file: File, table: &PhylogenyTable) -> Result<()> {
    let mut writer = BufWriter::new(file);
    for newick in to_newick(table)? {
        writer.write_all(newick.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Returns one Newick string per root of `table`, in ascending root id order.
///
/// Leaves are written with their escaped taxon label, inner vertices with
/// their label if they carry one. A branch length is the difference between
/// a vertex's origin time and its parent's.
///
/// # Errors
/// [HstratError::UnsatisfiableInvariant](crate::HstratError::UnsatisfiableInvariant)
/// if `table` is not a forest (duplicate ids, dangling ancestors, cycles).
///
/// # Example
/// ```
/// use hstrat::model::{PhylogenyRow, PhylogenyTable};
/// use hstrat::newick::to_newick;
///
/// let mut rows = vec![PhylogenyRow::new(0, 0), PhylogenyRow::new(1, 0), PhylogenyRow::new(2, 0)];
/// for (row, (origin, label)) in rows.iter_mut().zip([(0, None), (3, Some("A")), (5, Some("B"))]) {
///     row.origin_time = Some(origin);
///     row.taxon_label = label.map(str::to_string);
/// }
///
/// let trees = to_newick(&PhylogenyTable::new(rows))?;
/// assert_eq!(trees, vec!["(A:3,B:5);".to_string()]);
/// # Ok::<(), hstrat::HstratError>(())
/// ```
pub fn to_newick(table: &PhylogenyTable) -> Result<Vec<String>> {
    let order = table.topological_order()?;
    let rows = table.rows();

    let position_of: HashMap<u64, usize> = rows.iter().enumerate().map(|(position, row)| (row.id, position)).collect();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots = Vec::new();
    // Topological order visits siblings by ascending id
    for position in order {
        let row = &rows[position];
        if row.is_root() {
            roots.push(position);
        } else {
            children[position_of[&row.ancestor_id]].push(position);
        }
    }
    roots.sort_by_key(|&position| rows[position].id);

    let branch_lengths: Vec<Option<i64>> = rows
        .iter()
        .map(|row| match (row.is_root(), row.origin_time) {
            (false, Some(origin)) => rows[position_of[&row.ancestor_id]]
                .origin_time
                .map(|parent_origin| origin - parent_origin),
            _ => None,
        })
        .collect();

    Ok(roots
        .into_iter()
        .map(|root| write_tree(rows, &children, &branch_lengths, root))
        .collect())
}

// ============================================================================
// Helpers (private)
// ============================================================================
enum Step {
    Enter(usize),
    Separator,
    Exit(usize),
}

/// Serializes the subtree at `root` with an explicit stack.
fn write_tree(rows: &[PhylogenyRow], children: &[Vec<usize>], branch_lengths: &[Option<i64>], root: usize) -> String {
    let mut newick = String::with_capacity(rows.len() * CHARS_PER_ROW);
    let mut stack = vec![Step::Enter(root)];

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(position) if children[position].is_empty() => {
                write_vertex(&mut newick, &rows[position], branch_lengths[position]);
            }
            Step::Enter(position) => {
                newick.push('(');
                stack.push(Step::Exit(position));
                for (k, &child) in children[position].iter().enumerate().rev() {
                    stack.push(Step::Enter(child));
                    if k > 0 {
                        stack.push(Step::Separator);
                    }
                }
            }
            Step::Separator => newick.push(','),
            Step::Exit(position) => {
                newick.push(')');
                write_vertex(&mut newick, &rows[position], branch_lengths[position]);
            }
        }
    }

    newick.push(';');
    newick
}

/// Writes label and branch length of a vertex.
fn write_vertex(newick: &mut String, row: &PhylogenyRow, branch_length: Option<i64>) {
    if let Some(label) = &row.taxon_label {
        newick.push_str(&escape_label(label));
    }
    if let Some(branch_length) = branch_length {
        newick.push(':');
        newick.push_str(&branch_length.to_string());
    }
}
