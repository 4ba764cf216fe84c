//! Gaussian copula with Gaussian marginals
//!
//! Marginals are fitted per column (mean, population standard deviation).
//! Under Gaussian marginals the copula transform of a value is its z-score,
//! so the copula covariance is the correlation matrix of the z-scores.

use super::{FittedModel, ModelConfig, ModelFitter, Univariate};
use crate::frame;
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeMap;

/// Model type recorded in the export
pub const GAUSSIAN_MULTIVARIATE: &str = "gaussian_multivariate";

/// Univariate family recorded in the export
pub const GAUSSIAN_UNIVARIATE: &str = "gaussian_univariate";

/// Gaussian multivariate fitter
#[derive(Debug, Clone, Default)]
pub struct GaussianMultivariate {
    _private: (),
}

impl GaussianMultivariate {
    /// Create a fitter with default settings
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Create a fitter from a configuration mapping
    ///
    /// Accepted keys: `distribution` (`"gaussian"` or `"gaussian_univariate"`).
    ///
    /// # Errors
    /// Returns `Error::Config` for unknown keys or unsupported distributions
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        for (key, value) in config {
            match key.as_str() {
                "distribution" => match value.as_str() {
                    Some("gaussian" | GAUSSIAN_UNIVARIATE) => {}
                    _ => {
                        return Err(Error::Config(format!(
                            "unsupported distribution: {value}"
                        )))
                    }
                },
                other => return Err(Error::Config(format!("unknown key: {other}"))),
            }
        }
        Ok(Self::new())
    }
}

struct Marginal {
    mean: f64,
    scale: Option<f64>,
    z_scores: Option<Vec<f64>>,
}

#[allow(clippy::cast_precision_loss)]
fn fit_marginal(values: &[f64]) -> Marginal {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    // Constant columns have no defined scale
    if values.iter().all(|v| *v == values[0]) {
        return Marginal {
            mean: values[0],
            scale: None,
            z_scores: None,
        };
    }

    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    Marginal {
        mean,
        scale: Some(std),
        z_scores: Some(values.iter().map(|v| (v - mean) / std).collect()),
    }
}

#[allow(clippy::cast_precision_loss)]
fn correlation(a: Option<&Vec<f64>>, b: Option<&Vec<f64>>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            let n = a.len() as f64;
            let r = a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>() / n;
            r.clamp(-1.0, 1.0)
        }
        _ => 0.0,
    }
}

impl ModelFitter for GaussianMultivariate {
    fn fit(&self, data: &RecordBatch) -> Result<FittedModel> {
        if data.num_rows() == 0 {
            return Err(Error::Fit("cannot fit a model on zero rows".to_string()));
        }

        let schema = data.schema();
        let mut columns = Vec::with_capacity(schema.fields().len());
        let mut marginals = Vec::with_capacity(schema.fields().len());

        for (field, array) in schema.fields().iter().zip(data.columns()) {
            let name = field.name();
            if !field.data_type().is_numeric() {
                return Err(Error::Fit(format!(
                    "column '{name}' is not numeric ({:?})",
                    field.data_type()
                )));
            }
            if columns.contains(name) {
                return Err(Error::Fit(format!("duplicate column '{name}'")));
            }

            let values = frame::f64_values(array)?
                .into_iter()
                .map(|v| {
                    v.filter(|x| x.is_finite()).ok_or_else(|| {
                        Error::Fit(format!("column '{name}' has missing or non-finite values"))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            columns.push(name.clone());
            marginals.push(fit_marginal(&values));
        }

        let k = marginals.len();
        let mut covariance = vec![vec![0.0; k]; k];
        for i in 0..k {
            covariance[i][i] = 1.0;
            for j in 0..i {
                let r = correlation(
                    marginals[i].z_scores.as_ref(),
                    marginals[j].z_scores.as_ref(),
                );
                covariance[i][j] = r;
                covariance[j][i] = r;
            }
        }

        let distribs: BTreeMap<String, Univariate> = columns
            .iter()
            .zip(&marginals)
            .map(|(name, m)| {
                (
                    name.clone(),
                    Univariate::new(GAUSSIAN_UNIVARIATE, m.mean, m.scale),
                )
            })
            .collect();

        Ok(FittedModel::new(
            GAUSSIAN_MULTIVARIATE,
            GAUSSIAN_UNIVARIATE,
            columns,
            covariance,
            distribs,
        ))
    }
}
