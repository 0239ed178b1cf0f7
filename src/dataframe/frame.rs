//! A minimal columnar table for bulk input and output.
//!
//! The engine does not depend on any particular dataframe runtime; callers
//! convert their tables into a [Frame] of typed [Column]s and back.

use crate::error::{HstratError, Result};
use crate::model::{PhylogenyTable, Value};
use std::borrow::Cow;
use std::collections::BTreeSet;

// =#========================================================================#=
// COLUMN
// =#========================================================================#=
/// A typed column. [Column::Optional] holds cells that may be missing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Column {
    U64(Vec<u64>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Str(Vec<String>),
    Optional(Vec<Option<Value>>),
}

impl Column {
    /// Returns the number of cells.
    pub fn len(&self) -> usize {
        match self {
            Column::U64(values) => values.len(),
            Column::U32(values) => values.len(),
            Column::I64(values) => values.len(),
            Column::F64(values) => values.len(),
            Column::Str(values) => values.len(),
            Column::Optional(values) => values.len(),
        }
    }

    /// Returns `true` if the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cell at `row`, `None` if missing or out of bounds.
    pub fn value(&self, row: usize) -> Option<Value> {
        match self {
            Column::U64(values) => values.get(row).map(|&v| Value::U64(v)),
            Column::U32(values) => values.get(row).map(|&v| Value::U32(v)),
            Column::I64(values) => values.get(row).map(|&v| Value::I64(v)),
            Column::F64(values) => values.get(row).map(|&v| Value::F64(v)),
            Column::Str(values) => values.get(row).map(|v| Value::Str(v.clone())),
            Column::Optional(values) => values.get(row).cloned().flatten(),
        }
    }

    /// Returns the cell at `row` as `u64` when it is a non-negative integer.
    pub fn value_as_u64(&self, row: usize) -> Option<u64> {
        match self.value(row)? {
            Value::U64(v) => Some(v),
            Value::U32(v) => Some(v as u64),
            Value::I64(v) => u64::try_from(v).ok(),
            Value::F64(_) | Value::Str(_) => None,
        }
    }

    /// Returns the cell at `row` as `i64` when it is an integer.
    pub fn value_as_i64(&self, row: usize) -> Option<i64> {
        match self.value(row)? {
            Value::U64(v) => i64::try_from(v).ok(),
            Value::U32(v) => Some(v as i64),
            Value::I64(v) => Some(v),
            Value::F64(v) if v.is_finite() => Some(v.floor() as i64),
            Value::F64(_) | Value::Str(_) => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Column::U64(_) => "u64",
            Column::U32(_) => "u32",
            Column::I64(_) => "i64",
            Column::F64(_) => "f64",
            Column::Str(_) => "str",
            Column::Optional(_) => "optional",
        }
    }

    /// Collects cells into the narrowest complete column, falling back to
    /// [Column::Optional] for missing or mixed cells.
    pub fn from_values(values: Vec<Option<Value>>) -> Column {
        fn collect<T>(values: &[Option<Value>], pick: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
            values.iter().map(|value| value.as_ref().and_then(&pick)).collect()
        }

        let complete = match values.first() {
            Some(Some(Value::U64(_))) => collect(&values, |v| match v {
                Value::U64(v) => Some(*v),
                _ => None,
            })
            .map(Column::U64),
            Some(Some(Value::U32(_))) => collect(&values, |v| match v {
                Value::U32(v) => Some(*v),
                _ => None,
            })
            .map(Column::U32),
            Some(Some(Value::I64(_))) => collect(&values, |v| match v {
                Value::I64(v) => Some(*v),
                _ => None,
            })
            .map(Column::I64),
            Some(Some(Value::F64(_))) => collect(&values, |v| match v {
                Value::F64(v) => Some(*v),
                _ => None,
            })
            .map(Column::F64),
            Some(Some(Value::Str(_))) => collect(&values, |v| match v {
                Value::Str(v) => Some(v.clone()),
                _ => None,
            })
            .map(Column::Str),
            _ => None,
        };
        complete.unwrap_or(Column::Optional(values))
    }
}

// =#========================================================================#=
// FRAME
// =#========================================================================#=
/// Named, equally long columns in insertion order.
///
/// # Example
/// ```
/// use hstrat::dataframe::{Column, Frame};
///
/// let frame = Frame::new()
///     .with_column("data_id", Column::U64(vec![0, 0, 1]))?
///     .with_column("dstream_S", Column::U32(vec![4, 4, 4]))?;
///
/// assert_eq!(frame.num_rows(), 3);
/// assert_eq!(frame.column_as_u64("dstream_S")?.as_ref(), &[4, 4, 4]);
/// # Ok::<(), hstrat::HstratError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    columns: Vec<(String, Column)>,
}

impl Frame {
    /// Creates a frame without columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a column, consuming and returning the frame.
    ///
    /// # Errors
    /// [HstratError::MalformedAnnotation] if the column length differs from
    /// the existing columns.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.insert_column(name, column)?;
        Ok(self)
    }

    /// Adds (or replaces) a column.
    ///
    /// # Errors
    /// As [with_column](Self::with_column).
    pub fn insert_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        let others_len = self
            .columns
            .iter()
            .find(|(other, _)| *other != name)
            .map(|(_, other)| other.len());
        if let Some(expected) = others_len {
            if column.len() != expected {
                return Err(HstratError::malformed(format!(
                    "column '{name}' has {} rows, expected {expected}",
                    column.len()
                )));
            }
        }

        match self.columns.iter_mut().find(|(other, _)| *other == name) {
            Some((_, existing)) => *existing = column,
            None => self.columns.push((name, column)),
        }
        Ok(())
    }

    /// Returns the number of rows (0 without columns).
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, column)| column.len())
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the named column.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|(other, _)| other == name).map(|(_, column)| column)
    }

    /// Returns `true` if the named column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns an unsigned integer column, widening `u32` cells.
    ///
    /// # Errors
    /// [HstratError::MalformedAnnotation] if the column is missing or not
    /// an unsigned integer column.
    pub fn column_as_u64(&self, name: &str) -> Result<Cow<'_, [u64]>> {
        match self.column(name) {
            Some(Column::U64(values)) => Ok(Cow::Borrowed(values)),
            Some(Column::U32(values)) => Ok(Cow::Owned(values.iter().map(|&v| v as u64).collect())),
            Some(other) => Err(HstratError::malformed(format!(
                "column '{name}' must hold unsigned integers, found {}",
                other.type_name()
            ))),
            None => Err(HstratError::malformed(format!("missing required column '{name}'"))),
        }
    }
}

// ============================================================================
// Phylogeny output
// ============================================================================
impl PhylogenyTable {
    /// Renders the table as a frame in row order.
    ///
    /// Columns: `id`, `ancestor_id`, `origin_time`, `destruction_time`,
    /// `taxon_label`, `rank`, `differentia`, `data_id`, then user columns in
    /// name order. Columns absent from every row are omitted; partially
    /// present ones become [Column::Optional].
    pub fn to_frame(&self) -> Frame {
        let rows = self.rows();
        let mut columns: Vec<(String, Column)> = vec![
            ("id".to_string(), Column::U64(rows.iter().map(|row| row.id).collect())),
            (
                "ancestor_id".to_string(),
                Column::U64(rows.iter().map(|row| row.ancestor_id).collect()),
            ),
        ];

        let mut push = |name: &str, values: Vec<Option<Value>>| {
            if values.iter().any(Option::is_some) {
                columns.push((name.to_string(), Column::from_values(values)));
            }
        };
        push("origin_time", rows.iter().map(|row| row.origin_time.map(Value::I64)).collect());
        push(
            "destruction_time",
            rows.iter().map(|row| row.destruction_time.map(Value::F64)).collect(),
        );
        push(
            "taxon_label",
            rows.iter().map(|row| row.taxon_label.clone().map(Value::Str)).collect(),
        );
        push("rank", rows.iter().map(|row| row.rank.map(Value::U64)).collect());
        push("differentia", rows.iter().map(|row| row.differentia.map(Value::U64)).collect());
        push("data_id", rows.iter().map(|row| row.data_id.map(Value::U64)).collect());

        let extra_names: BTreeSet<&String> = rows.iter().flat_map(|row| row.extras.keys()).collect();
        for name in extra_names {
            push(name, rows.iter().map(|row| row.extras.get(name).cloned()).collect());
        }

        Frame { columns }
    }
}

// =#========================================================================#=
// TESTS - FRAME
// =#========================================================================#=
#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PhylogenyRow;

    #[test]
    fn test_with_column_rejects_length_mismatch() {
        let result = Frame::new()
            .with_column("a", Column::U64(vec![1, 2]))
            .and_then(|frame| frame.with_column("b", Column::U64(vec![1])));
        assert!(matches!(result, Err(HstratError::MalformedAnnotation { .. })));
    }

    #[test]
    fn test_column_as_u64_type_checks() {
        let frame = Frame::new()
            .with_column("rank", Column::F64(vec![1.0]))
            .unwrap();
        assert!(frame.column_as_u64("rank").is_err());
        assert!(frame.column_as_u64("missing").is_err());
    }

    #[test]
    fn test_from_values_falls_back_to_optional() {
        assert_eq!(
            Column::from_values(vec![Some(Value::U64(1)), Some(Value::U64(2))]),
            Column::U64(vec![1, 2])
        );
        assert!(matches!(
            Column::from_values(vec![Some(Value::U64(1)), None]),
            Column::Optional(_)
        ));
    }

    #[test]
    fn test_to_frame_omits_absent_columns() {
        let mut leaf = PhylogenyRow::new(1, 0);
        leaf.taxon_label = Some("a".to_string());
        let table = PhylogenyTable::new(vec![PhylogenyRow::new(0, 0), leaf]);

        let frame = table.to_frame();
        let names: Vec<&str> = frame.column_names().collect();
        assert_eq!(names, vec!["id", "ancestor_id", "taxon_label"]);
        assert_eq!(frame.column("taxon_label").unwrap().value(1), Some(Value::Str("a".to_string())));
    }
}
