//! Missing-value imputation
//!
//! Numeric columns are filled with their mean (NaN counts as missing) and
//! become `Float64`. String and boolean columns are filled with their most
//! frequent value; ties go to the smallest value. The input table is left
//! untouched.

use crate::frame;
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, StringArray};
use arrow::compute;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Return a copy of `data` with every missing value filled
///
/// # Errors
/// Returns `Error::Imputation` if a column with missing values has no
/// observed value to compute a fill from, or has an unsupported type
pub fn impute(data: &RecordBatch) -> Result<RecordBatch> {
    let schema = data.schema();
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(schema.fields().len());

    for (field, array) in schema.fields().iter().zip(data.columns()) {
        let filled = if field.data_type().is_numeric() {
            fill_mean(field.name(), array)?
        } else if array.null_count() == 0 {
            array.clone()
        } else {
            fill_mode(field.name(), array)?
        };

        fields.push(
            field
                .as_ref()
                .clone()
                .with_data_type(filled.data_type().clone()),
        );
        columns.push(filled);
    }

    frame::build_batch(fields, columns, data.num_rows())
}

fn entirely_missing(column: &str) -> Error {
    Error::Imputation {
        column: column.to_string(),
        reason: "column is entirely missing".to_string(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn fill_mean(column: &str, array: &ArrayRef) -> Result<ArrayRef> {
    let values = frame::f64_values(array)?;
    let observed: Vec<f64> = values.iter().filter_map(|v| *v).collect();

    if observed.len() == values.len() {
        return Ok(Arc::new(Float64Array::from(observed)));
    }
    if observed.is_empty() {
        return Err(entirely_missing(column));
    }

    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    Ok(Arc::new(Float64Array::from_iter_values(
        values.into_iter().map(|v| v.unwrap_or(mean)),
    )))
}

fn most_frequent<T: Ord + Clone>(values: impl Iterator<Item = T>) -> Option<T> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&T, usize)> = None;
    for (value, &count) in &counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}

fn fill_mode(column: &str, array: &ArrayRef) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let cast = compute::cast(array, &DataType::Utf8)?;
            let strings = cast
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| Error::Other("Failed to downcast to StringArray".to_string()))?;
            let mode = most_frequent(strings.iter().flatten())
                .ok_or_else(|| entirely_missing(column))?;
            Ok(Arc::new(StringArray::from_iter_values(
                strings.iter().map(|v| v.unwrap_or(mode)),
            )))
        }
        DataType::Boolean => {
            let flags = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(|| Error::Other("Failed to downcast to BooleanArray".to_string()))?;
            let mode =
                most_frequent(flags.iter().flatten()).ok_or_else(|| entirely_missing(column))?;
            Ok(Arc::new(BooleanArray::from(
                flags.iter().map(|v| v.unwrap_or(mode)).collect::<Vec<bool>>(),
            )))
        }
        other => Err(Error::Imputation {
            column: column.to_string(),
            reason: format!("cannot impute values of type {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use arrow::datatypes::{Field, Schema};

    fn table(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
        let fields = columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>();
        RecordBatch::try_new(
            Arc::new(Schema::new(fields)),
            columns.into_iter().map(|(_, a)| a).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_numeric_filled_with_mean() {
        let data = table(vec![(
            "x",
            Arc::new(Int32Array::from(vec![Some(1), None, Some(3)])) as ArrayRef,
        )]);
        let filled = impute(&data).unwrap();

        let x = filled
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(x.values().to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(x.null_count(), 0);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let data = table(vec![(
            "x",
            Arc::new(Float64Array::from(vec![2.0, f64::NAN, 4.0])) as ArrayRef,
        )]);
        let filled = impute(&data).unwrap();
        let x = filled
            .column(0)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(x.value(1), 3.0);
    }

    #[test]
    fn test_string_filled_with_first_mode() {
        let data = table(vec![(
            "tag",
            Arc::new(StringArray::from(vec![
                Some("b"),
                Some("a"),
                None,
                Some("b"),
                Some("a"),
            ])) as ArrayRef,
        )]);
        let filled = impute(&data).unwrap();
        let tag = filled
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(tag.value(2), "a");
    }

    #[test]
    fn test_boolean_filled_with_mode() {
        let data = table(vec![(
            "flag",
            Arc::new(BooleanArray::from(vec![Some(true), None, Some(true), Some(false)]))
                as ArrayRef,
        )]);
        let filled = impute(&data).unwrap();
        let flag = filled
            .column(0)
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap();
        assert!(flag.value(1));
    }

    #[test]
    fn test_entirely_missing_column_fails() {
        let data = table(vec![(
            "x",
            Arc::new(Float64Array::from(vec![None::<f64>, None])) as ArrayRef,
        )]);
        let err = impute(&data).unwrap_err();
        assert!(matches!(err, Error::Imputation { ref column, .. } if column == "x"));

        let data = table(vec![(
            "s",
            Arc::new(StringArray::from(vec![None::<&str>])) as ArrayRef,
        )]);
        assert!(impute(&data).is_err());
    }

    #[test]
    fn test_input_is_not_modified() {
        let data = table(vec![(
            "x",
            Arc::new(Float64Array::from(vec![Some(1.0), None])) as ArrayRef,
        )]);
        let _ = impute(&data).unwrap();
        assert_eq!(data.column(0).null_count(), 1);
    }
}
