//! Arrow table helpers
//!
//! Tables are plain `RecordBatch`es. Row identity is never implicit: callers
//! extract key values explicitly and align rows through them.

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, UInt32Array};
use arrow::compute::{self, CastOptions};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pre-loaded tables keyed by table name
pub type Tables = HashMap<String, RecordBatch>;

/// A primary/foreign key value used to align child groups with parent rows
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    /// Any integer key column
    Int(i64),
    /// String key column
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Look up a column by name
///
/// # Errors
/// Returns `Error::ColumnNotFound` if the table has no such column
pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
}

/// Read a key column as one optional key per row (null keys become `None`)
///
/// # Errors
/// Returns error if the column is missing or is neither integer nor string typed
pub fn key_values(batch: &RecordBatch, name: &str) -> Result<Vec<Option<KeyValue>>> {
    let array = column(batch, name)?;
    let data_type = array.data_type();

    if data_type.is_integer() {
        // Unsafe cast: a key outside the i64 range fails instead of turning null
        let options = CastOptions {
            safe: false,
            ..CastOptions::default()
        };
        let cast = compute::cast_with_options(array, &DataType::Int64, &options).map_err(|e| {
            Error::UnsupportedKeyType {
                column: name.to_string(),
                data_type: format!("{data_type:?} ({e})"),
            }
        })?;
        let ints = cast
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| Error::Other("Failed to downcast to Int64Array".to_string()))?;
        Ok(ints.iter().map(|v| v.map(KeyValue::Int)).collect())
    } else if matches!(data_type, DataType::Utf8 | DataType::LargeUtf8) {
        let cast = compute::cast(array, &DataType::Utf8)?;
        let strings = cast
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| Error::Other("Failed to downcast to StringArray".to_string()))?;
        Ok(strings
            .iter()
            .map(|v| v.map(|s| KeyValue::Text(s.to_string())))
            .collect())
    } else {
        Err(Error::UnsupportedKeyType {
            column: name.to_string(),
            data_type: format!("{data_type:?}"),
        })
    }
}

/// Read a numeric column as optional `f64`s; NaN is reported as missing
///
/// # Errors
/// Returns error if the array cannot be cast to `Float64`
pub fn f64_values(array: &ArrayRef) -> Result<Vec<Option<f64>>> {
    let cast = compute::cast(array, &DataType::Float64)?;
    let floats = cast
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))?;
    Ok(floats.iter().map(|v| v.filter(|x| !x.is_nan())).collect())
}

/// Build a batch with an explicit row count (zero-column batches are legal)
///
/// # Errors
/// Returns error if column lengths disagree with each other or with `num_rows`
pub fn build_batch(
    fields: Vec<Field>,
    columns: Vec<ArrayRef>,
    num_rows: usize,
) -> Result<RecordBatch> {
    let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

fn parts(batch: &RecordBatch) -> (Vec<Field>, Vec<ArrayRef>) {
    let fields = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone())
        .collect();
    (fields, batch.columns().to_vec())
}

/// Remove a column by name
///
/// # Errors
/// Returns `Error::ColumnNotFound` if the column does not exist
pub fn drop_column(batch: &RecordBatch, name: &str) -> Result<RecordBatch> {
    let index = batch
        .schema()
        .index_of(name)
        .map_err(|_| Error::ColumnNotFound(name.to_string()))?;

    let (mut fields, mut columns) = parts(batch);
    fields.remove(index);
    columns.remove(index);
    build_batch(fields, columns, batch.num_rows())
}

/// Insert a new column at `position`
///
/// # Errors
/// Returns `Error::ColumnCollision` if a column with that name already exists
pub fn insert_column(
    batch: &RecordBatch,
    position: usize,
    name: &str,
    array: ArrayRef,
) -> Result<RecordBatch> {
    if batch.schema().column_with_name(name).is_some() {
        return Err(Error::ColumnCollision(name.to_string()));
    }

    let (mut fields, mut columns) = parts(batch);
    let position = position.min(fields.len());
    fields.insert(position, Field::new(name, array.data_type().clone(), true));
    columns.insert(position, array);
    build_batch(fields, columns, batch.num_rows())
}

/// Replace a column in place, or append it if the table has no such column
///
/// # Errors
/// Returns error if the array length differs from the table's row count
pub fn set_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let (mut fields, mut columns) = parts(batch);
    let field = Field::new(name, array.data_type().clone(), true);

    match fields.iter().position(|f| f.name() == name) {
        Some(index) => {
            fields[index] = field;
            columns[index] = array;
        }
        None => {
            fields.push(field);
            columns.push(array);
        }
    }
    build_batch(fields, columns, batch.num_rows())
}

/// Select rows by position
///
/// # Errors
/// Returns error if an index is out of bounds
pub fn take_rows(batch: &RecordBatch, rows: &[u32]) -> Result<RecordBatch> {
    let indices = UInt32Array::from(rows.to_vec());
    let (fields, columns) = parts(batch);
    let columns = columns
        .iter()
        .map(|c| compute::take(c.as_ref(), &indices, None))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    build_batch(fields, columns, rows.len())
}

/// Group row positions by key, groups ordered by first appearance of the key
///
/// Rows with a null key belong to no group.
///
/// # Errors
/// Returns error if the table has more rows than a `u32` index can address
pub fn group_rows(keys: &[Option<KeyValue>]) -> Result<Vec<(KeyValue, Vec<u32>)>> {
    let mut positions: HashMap<&KeyValue, usize> = HashMap::new();
    let mut groups: Vec<(KeyValue, Vec<u32>)> = Vec::new();

    for (row, key) in keys.iter().enumerate() {
        let Some(key) = key else { continue };
        let row = u32::try_from(row)
            .map_err(|_| Error::Other(format!("Row index {row} exceeds u32 range")))?;

        match positions.get(key) {
            Some(&group) => groups[group].1.push(row),
            None => {
                positions.insert(key, groups.len());
                groups.push((key.clone(), vec![row]));
            }
        }
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float32Array, UInt64Array};

    fn sample() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("value", DataType::Float32, true),
            Field::new("tag", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(arrow::array::Int32Array::from(vec![7, 8, 7])),
                Arc::new(Float32Array::from(vec![Some(1.5), None, Some(f32::NAN)])),
                Arc::new(StringArray::from(vec![Some("a"), None, Some("b")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_key_values_int_and_text() {
        let batch = sample();
        let ints = key_values(&batch, "id").unwrap();
        assert_eq!(ints, vec![Some(KeyValue::Int(7)), Some(KeyValue::Int(8)), Some(KeyValue::Int(7))]);

        let text = key_values(&batch, "tag").unwrap();
        assert_eq!(text, vec![Some(KeyValue::from("a")), None, Some(KeyValue::from("b"))]);
    }

    #[test]
    fn test_key_values_rejects_float_keys() {
        let err = key_values(&sample(), "value").unwrap_err();
        assert!(matches!(err, Error::UnsupportedKeyType { .. }));
    }

    #[test]
    fn test_key_values_rejects_out_of_range_unsigned_keys() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::UInt64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(UInt64Array::from(vec![Some(1), None, Some(u64::MAX - 1)]))],
        )
        .unwrap();

        let err = key_values(&batch, "id").unwrap_err();
        assert!(matches!(err, Error::UnsupportedKeyType { ref column, .. } if column == "id"));

        // In-range unsigned keys and nulls still come through
        let small = batch.slice(0, 2);
        assert_eq!(
            key_values(&small, "id").unwrap(),
            vec![Some(KeyValue::Int(1)), None]
        );
    }

    #[test]
    fn test_missing_column() {
        let err = key_values(&sample(), "nope").unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_f64_values_treats_nan_as_missing() {
        let batch = sample();
        let values = f64_values(batch.column(1)).unwrap();
        assert_eq!(values, vec![Some(1.5), None, None]);
    }

    #[test]
    fn test_group_rows_first_appearance_order() {
        let keys = vec![
            Some(KeyValue::Int(3)),
            Some(KeyValue::Int(1)),
            None,
            Some(KeyValue::Int(3)),
        ];
        let groups = group_rows(&keys).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], (KeyValue::Int(3), vec![0, 3]));
        assert_eq!(groups[1], (KeyValue::Int(1), vec![1]));
    }

    #[test]
    fn test_column_edits() {
        let batch = sample();
        let dropped = drop_column(&batch, "id").unwrap();
        assert_eq!(dropped.num_columns(), 2);
        assert_eq!(dropped.num_rows(), 3);

        // Dropping every column keeps the row count
        let empty = drop_column(&drop_column(&dropped, "value").unwrap(), "tag").unwrap();
        assert_eq!(empty.num_columns(), 0);
        assert_eq!(empty.num_rows(), 3);

        let restored = insert_column(&empty, 0, "id", batch.column(0).clone()).unwrap();
        assert_eq!(restored.schema().field(0).name(), "id");

        let err = insert_column(&restored, 1, "id", batch.column(0).clone()).unwrap_err();
        assert!(matches!(err, Error::ColumnCollision(_)));

        let replaced = set_column(&restored, "id", batch.column(1).clone()).unwrap();
        assert_eq!(replaced.num_columns(), 1);
        assert_eq!(replaced.column(0).data_type(), &DataType::Float32);
    }

    #[test]
    fn test_take_rows() {
        let taken = take_rows(&sample(), &[2, 0]).unwrap();
        assert_eq!(taken.num_rows(), 2);
        let keys = key_values(&taken, "id").unwrap();
        assert_eq!(keys, vec![Some(KeyValue::Int(7)), Some(KeyValue::Int(7))]);
    }
}
