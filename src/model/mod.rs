//! Distribution-fitting primitive
//!
//! The traversal only depends on [`ModelFitter`]; [`GaussianMultivariate`] is
//! the bundled implementation.

mod gaussian;

pub use gaussian::{GaussianMultivariate, GAUSSIAN_MULTIVARIATE, GAUSSIAN_UNIVARIATE};

use crate::params::{Param, COVARIANCE_KEY, DISTRIBS_KEY, SCALE_KEY};
use crate::Result;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration mapping handed to a fitter at construction
pub type ModelConfig = serde_json::Map<String, serde_json::Value>;

/// Fits a multivariate model over every column of a table
pub trait ModelFitter {
    /// Fit a model on fully populated (imputed) data
    ///
    /// # Errors
    /// Returns `Error::Fit` if the data cannot support a model
    fn fit(&self, data: &RecordBatch) -> Result<FittedModel>;
}

/// Univariate distribution descriptor for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Univariate {
    distribution: String,
    loc: f64,
    scale: Option<f64>,
}

impl Univariate {
    /// Create a descriptor; `scale` is `None` when undefined
    #[must_use]
    pub fn new(distribution: impl Into<String>, loc: f64, scale: Option<f64>) -> Self {
        Self {
            distribution: distribution.into(),
            loc,
            scale,
        }
    }

    /// Distribution family name
    #[must_use]
    pub fn distribution(&self) -> &str {
        &self.distribution
    }

    /// Location parameter
    #[must_use]
    pub const fn loc(&self) -> f64 {
        self.loc
    }

    /// Scale parameter, if defined
    #[must_use]
    pub const fn scale(&self) -> Option<f64> {
        self.scale
    }

    fn to_params(&self) -> Param {
        Param::mapping([
            ("type", Param::text(self.distribution.as_str())),
            ("fitted", Param::flag(true)),
            ("mean", Param::number(self.loc)),
            (SCALE_KEY, self.scale.map_or_else(Param::null, Param::number)),
        ])
    }
}

/// A fitted multivariate model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    model_type: String,
    distribution: String,
    columns: Vec<String>,
    covariance: Vec<Vec<f64>>,
    distribs: BTreeMap<String, Univariate>,
}

impl FittedModel {
    /// Assemble a fitted model
    #[must_use]
    pub fn new(
        model_type: impl Into<String>,
        distribution: impl Into<String>,
        columns: Vec<String>,
        covariance: Vec<Vec<f64>>,
        distribs: BTreeMap<String, Univariate>,
    ) -> Self {
        Self {
            model_type: model_type.into(),
            distribution: distribution.into(),
            columns,
            covariance,
            distribs,
        }
    }

    /// Model type name
    #[must_use]
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Columns the model was fitted on, in table order
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Square covariance matrix, rows/columns in `columns()` order
    #[must_use]
    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.covariance
    }

    /// Per-column univariate descriptors
    #[must_use]
    pub const fn distribs(&self) -> &BTreeMap<String, Univariate> {
        &self.distribs
    }

    /// Export parameters as a nested tree
    ///
    /// `type`, `fitted` and `distribution` are bookkeeping markers; the fit
    /// values live under `covariance` and `distribs`.
    #[must_use]
    pub fn to_params(&self) -> Param {
        let covariance = Param::sequence(
            self.covariance
                .iter()
                .map(|row| Param::sequence(row.iter().copied().map(Param::number))),
        );
        let distribs = Param::mapping(
            self.distribs
                .iter()
                .map(|(column, univariate)| (column.as_str(), univariate.to_params())),
        );

        Param::mapping([
            (COVARIANCE_KEY, covariance),
            (DISTRIBS_KEY, distribs),
            ("type", Param::text(self.model_type.as_str())),
            ("fitted", Param::flag(true)),
            ("distribution", Param::text(self.distribution.as_str())),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::flatten;

    #[test]
    fn test_export_flattens_to_fit_values_only() {
        let mut distribs = BTreeMap::new();
        distribs.insert("a".to_string(), Univariate::new("gauss", 1.0, Some(2.0)));
        distribs.insert("b".to_string(), Univariate::new("gauss", 3.0, None));
        let model = FittedModel::new(
            "mv",
            "gauss",
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            distribs,
        );

        let flat = flatten(&model.to_params());
        let keys: Vec<&str> = flat.keys().collect();
        assert_eq!(
            keys,
            vec![
                "covariance__0__0",
                "covariance__0__1",
                "covariance__1__0",
                "covariance__1__1",
                "distribs__a__mean",
                "distribs__a__std",
                "distribs__b__mean",
                "distribs__b__std",
            ]
        );
    }
}
