//! Child-table extensions
//!
//! A child table is split into groups of rows sharing a foreign-key value.
//! Each group gets its own model whose encoded, flattened parameters become
//! one extension row, keyed by the foreign-key value and merged onto the
//! parent row with the matching primary key.

use super::model_params;
use crate::frame::{self, KeyValue};
use crate::model::ModelFitter;
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Extension key holding the number of child rows in a group
pub const CHILD_ROWS: &str = "child_rows";

/// Extension column name for a child table's key
#[must_use]
pub fn prefixed(child_name: &str, key: &str) -> String {
    format!("__{child_name}__{key}")
}

/// One extension row per foreign-key value of a child table
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionFrame {
    child_name: String,
    keys: Vec<KeyValue>,
    columns: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl ExtensionFrame {
    /// Child table the extension summarizes
    #[must_use]
    pub fn child_name(&self) -> &str {
        &self.child_name
    }

    /// Foreign-key value of each row, in first-appearance order
    #[must_use]
    pub fn keys(&self) -> &[KeyValue] {
        &self.keys
    }

    /// Prefixed extension column names
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of extension rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.keys.len()
    }

    /// Name of the child-row count column
    #[must_use]
    pub fn count_column(&self) -> String {
        prefixed(&self.child_name, CHILD_ROWS)
    }

    /// Value of `column` in the row for `key`; `None` if absent or missing
    #[must_use]
    pub fn value(&self, key: &KeyValue, column: &str) -> Option<f64> {
        let row = self.keys.iter().position(|k| k == key)?;
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows[row][col]
    }

    /// Left-merge onto a parent table aligned by `parent_keys`
    ///
    /// Every parent row is kept. Rows without a matching extension row get a
    /// count of 0 and missing parameter values.
    ///
    /// # Errors
    /// Returns error if `parent_keys` does not have one key per parent row or
    /// an extension column already exists on the parent
    pub fn merge_onto(
        &self,
        parent: &RecordBatch,
        parent_keys: &[Option<KeyValue>],
    ) -> Result<RecordBatch> {
        if parent_keys.len() != parent.num_rows() {
            return Err(Error::Other(format!(
                "{} parent keys for {} parent rows",
                parent_keys.len(),
                parent.num_rows()
            )));
        }

        let lookup: HashMap<&KeyValue, usize> =
            self.keys.iter().enumerate().map(|(i, k)| (k, i)).collect();
        let matched: Vec<Option<usize>> = parent_keys
            .iter()
            .map(|key| key.as_ref().and_then(|k| lookup.get(k).copied()))
            .collect();

        let schema = parent.schema();
        let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
        let mut columns: Vec<ArrayRef> = parent.columns().to_vec();
        let count_column = self.count_column();

        for (index, name) in self.columns.iter().enumerate() {
            if schema.column_with_name(name).is_some() {
                return Err(Error::ColumnCollision(name.clone()));
            }

            let fill = if *name == count_column { Some(0.0) } else { None };
            let values: Vec<Option<f64>> = matched
                .iter()
                .map(|row| row.map_or(fill, |r| self.rows[r][index]))
                .collect();

            fields.push(Field::new(name, DataType::Float64, true));
            columns.push(Arc::new(Float64Array::from(values)));
        }

        debug!(
            child = %self.child_name,
            matched = matched.iter().filter(|m| m.is_some()).count(),
            rows = parent.num_rows(),
            "Merged extension"
        );

        frame::build_batch(fields, columns, parent.num_rows())
    }
}

/// Build the extension of `child_table` grouped by `foreign_key`
///
/// Each group is imputed, fitted, encoded and flattened; rows with a null
/// foreign key belong to no group.
///
/// # Errors
/// Returns error if the foreign key column is missing or unusable, or if
/// imputing, fitting or encoding any group fails
#[allow(clippy::cast_precision_loss)]
pub fn extend<F: ModelFitter + ?Sized>(
    fitter: &F,
    child_table: &RecordBatch,
    child_name: &str,
    foreign_key: &str,
) -> Result<ExtensionFrame> {
    let keys = frame::key_values(child_table, foreign_key)?;
    let orphans = keys.iter().filter(|k| k.is_none()).count();
    if orphans > 0 {
        debug!(child = child_name, rows = orphans, "Skipping rows with a null foreign key");
    }
    let groups = frame::group_rows(&keys)?;
    let data = frame::drop_column(child_table, foreign_key)?;

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, Option<f64>)>> = Vec::with_capacity(groups.len());
    let mut group_keys = Vec::with_capacity(groups.len());

    for (key, rows) in groups {
        debug!(child = child_name, key = %key, rows = rows.len(), "Fitting group");

        let group = frame::take_rows(&data, &rows)?;
        let params = model_params(fitter, &group)?;

        let mut entries = Vec::with_capacity(params.len() + 1);
        for (flat_key, value) in params.iter() {
            entries.push((prefixed(child_name, flat_key), value.as_feature(flat_key)?));
        }
        entries.push((prefixed(child_name, CHILD_ROWS), Some(rows.len() as f64)));

        let sparse = entries
            .into_iter()
            .map(|(name, value)| {
                let next = columns.len();
                let position = *positions.entry(name.clone()).or_insert_with(|| {
                    columns.push(name);
                    next
                });
                (position, value)
            })
            .collect();

        sparse_rows.push(sparse);
        group_keys.push(key);
    }

    let count_column = prefixed(child_name, CHILD_ROWS);
    if !positions.contains_key(&count_column) {
        columns.push(count_column);
    }

    let rows = sparse_rows
        .into_iter()
        .map(|sparse| {
            let mut row = vec![None; columns.len()];
            for (position, value) in sparse {
                row[position] = value;
            }
            row
        })
        .collect();

    Ok(ExtensionFrame {
        child_name: child_name.to_string(),
        keys: group_keys,
        columns,
        rows,
    })
}
