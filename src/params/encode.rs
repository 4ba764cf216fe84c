//! Covariance and scale encoding
//!
//! Applied to a model's exported parameters before flattening:
//! - the covariance matrix is reduced to its lower triangle, stored ragged
//!   (row `i` keeps its first `i + 1` entries), so an n×n matrix yields
//!   n(n+1)/2 values from which the symmetric matrix can be rebuilt
//! - every distribution scale that is present and non-null is replaced by
//!   its natural logarithm
//!
//! The exported tree is never modified; a new encoded tree is returned.

use super::{Param, Scalar};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Covariance matrix field of a model export
pub const COVARIANCE_KEY: &str = "covariance";

/// Per-column distribution descriptors of a model export
pub const DISTRIBS_KEY: &str = "distribs";

/// Scale field of a distribution descriptor
pub const SCALE_KEY: &str = "std";

/// Lower triangle of a square matrix as ragged rows
///
/// # Errors
/// Returns `Error::Encoding` if the matrix is not square
pub fn lower_triangle(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();
    matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if row.len() == n {
                Ok(row[..=i].to_vec())
            } else {
                Err(Error::Encoding(format!(
                    "covariance row {i} has {} entries, expected {n}",
                    row.len()
                )))
            }
        })
        .collect()
}

/// Encode a model export: ragged lower-triangular covariance, log scales
///
/// # Errors
/// Returns `Error::Encoding` if the export is not a mapping, lacks a
/// numeric square covariance matrix, or carries a non-numeric scale
pub fn encode(params: &Param) -> Result<Param> {
    let Param::Mapping(entries) = params else {
        return Err(Error::Encoding(
            "model parameters must be a mapping".to_string(),
        ));
    };

    let covariance = entries
        .get(COVARIANCE_KEY)
        .ok_or_else(|| Error::Encoding(format!("missing '{COVARIANCE_KEY}' field")))?;

    let mut encoded = entries.clone();
    encoded.insert(COVARIANCE_KEY.to_string(), encode_covariance(covariance)?);
    if let Some(distribs) = entries.get(DISTRIBS_KEY) {
        encoded.insert(DISTRIBS_KEY.to_string(), log_scales(distribs)?);
    }

    Ok(Param::Mapping(encoded))
}

fn encode_covariance(covariance: &Param) -> Result<Param> {
    let Param::Sequence(rows) = covariance else {
        return Err(Error::Encoding("covariance must be a sequence of rows".to_string()));
    };

    let matrix = rows
        .iter()
        .map(|row| match row {
            Param::Sequence(values) => values
                .iter()
                .map(|v| {
                    v.as_number().ok_or_else(|| {
                        Error::Encoding("covariance entries must be numeric".to_string())
                    })
                })
                .collect::<Result<Vec<f64>>>(),
            _ => Err(Error::Encoding("covariance row must be a sequence".to_string())),
        })
        .collect::<Result<Vec<_>>>()?;

    let ragged = lower_triangle(&matrix)?;
    Ok(Param::sequence(ragged.into_iter().map(|row| {
        Param::sequence(row.into_iter().map(Param::number))
    })))
}

fn log_scales(distribs: &Param) -> Result<Param> {
    let Param::Mapping(columns) = distribs else {
        return Ok(distribs.clone());
    };

    let mut encoded = BTreeMap::new();
    for (column, descriptor) in columns {
        let descriptor = match descriptor {
            Param::Mapping(fields) => match fields.get(SCALE_KEY) {
                Some(Param::Scalar(Scalar::Number(scale))) => {
                    let mut fields = fields.clone();
                    fields.insert(SCALE_KEY.to_string(), Param::number(scale.ln()));
                    Param::Mapping(fields)
                }
                None | Some(Param::Scalar(Scalar::Null)) => descriptor.clone(),
                Some(_) => {
                    return Err(Error::Encoding(format!(
                        "scale of '{column}' must be numeric or null"
                    )))
                }
            },
            other => other.clone(),
        };
        encoded.insert(column.clone(), descriptor);
    }

    Ok(Param::Mapping(encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix_param(matrix: &[&[f64]]) -> Param {
        Param::sequence(
            matrix
                .iter()
                .map(|row| Param::sequence(row.iter().copied().map(Param::number))),
        )
    }

    fn descriptor(scale: Param) -> Param {
        Param::mapping([("mean", Param::number(1.0)), (SCALE_KEY, scale)])
    }

    #[test]
    fn test_lower_triangle_ragged() {
        let matrix = vec![
            vec![1.0, 0.2, 0.3],
            vec![0.2, 1.0, 0.4],
            vec![0.3, 0.4, 1.0],
        ];
        let ragged = lower_triangle(&matrix).unwrap();
        assert_eq!(ragged, vec![vec![1.0], vec![0.2, 1.0], vec![0.3, 0.4, 1.0]]);
    }

    #[test]
    fn test_lower_triangle_rejects_non_square() {
        let err = lower_triangle(&[vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_encode_logs_present_scales_only() {
        let params = Param::mapping([
            (COVARIANCE_KEY, matrix_param(&[&[1.0, 0.5], &[0.5, 1.0]])),
            (
                DISTRIBS_KEY,
                Param::mapping([
                    ("a", descriptor(Param::number(std::f64::consts::E))),
                    ("b", descriptor(Param::null())),
                    ("c", Param::mapping([("mean", Param::number(2.0))])),
                ]),
            ),
        ]);

        let encoded = encode(&params).unwrap();
        let distribs = encoded.get(DISTRIBS_KEY).unwrap();

        let a = distribs.get("a").and_then(|d| d.get(SCALE_KEY)).unwrap();
        assert!((a.as_number().unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(distribs.get("b").and_then(|d| d.get(SCALE_KEY)), Some(&Param::null()));
        assert!(distribs.get("c").and_then(|d| d.get(SCALE_KEY)).is_none());

        assert_eq!(
            encoded.get(COVARIANCE_KEY),
            Some(&matrix_param(&[&[1.0], &[0.5, 1.0]]))
        );
    }

    #[test]
    fn test_encode_leaves_input_untouched() {
        let params = Param::mapping([
            (COVARIANCE_KEY, matrix_param(&[&[4.0]])),
            (DISTRIBS_KEY, Param::mapping([("a", descriptor(Param::number(2.0)))])),
        ]);
        let before = params.clone();
        let _ = encode(&params).unwrap();
        assert_eq!(params, before);
    }

    #[test]
    fn test_encode_requires_covariance() {
        let err = encode(&Param::mapping([(DISTRIBS_KEY, Param::mapping::<String>([]))]))
            .unwrap_err();
        assert!(err.to_string().contains(COVARIANCE_KEY));

        assert!(encode(&Param::number(1.0)).is_err());
    }

    #[test]
    fn test_encode_rejects_text_scale() {
        let params = Param::mapping([
            (COVARIANCE_KEY, matrix_param(&[&[1.0]])),
            (DISTRIBS_KEY, Param::mapping([("a", descriptor(Param::text("wide")))])),
        ]);
        assert!(matches!(encode(&params), Err(Error::Encoding(_))));
    }
}
