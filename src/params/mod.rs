//! Fitted-model parameter structures
//!
//! A fitted model exports its parameters as a [`Param`] tree. Before the
//! tree becomes feature columns on a parent table it is encoded
//! ([`encode`]) and then flattened ([`flatten`]) into a single-level map.
//!
//! ```rust
//! use cpa_modeler::params::{flatten, Param};
//!
//! let params = Param::mapping([
//!     ("mu", Param::sequence([Param::number(1.0), Param::number(2.0)])),
//!     ("type", Param::text("gaussian")),
//! ]);
//!
//! let flat = flatten(&params);
//! assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["mu__0", "mu__1"]);
//! ```

mod encode;
mod flatten;

pub use encode::{encode, lower_triangle, COVARIANCE_KEY, DISTRIBS_KEY, SCALE_KEY};
pub use flatten::{flatten, FlatParams, IGNORED_KEYS, KEY_DELIMITER};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Undefined value (e.g. the scale of a constant column)
    Null,
    /// Boolean flag
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Free text (model type names and similar markers)
    Text(String),
}

impl Scalar {
    /// Convert to a feature value: numbers pass through, booleans become 1/0,
    /// null becomes missing.
    ///
    /// # Errors
    /// Returns `Error::NonNumericParameter` for text values
    pub fn as_feature(&self, key: &str) -> Result<Option<f64>> {
        match self {
            Self::Null => Ok(None),
            Self::Bool(flag) => Ok(Some(if *flag { 1.0 } else { 0.0 })),
            Self::Number(value) => Ok(Some(*value)),
            Self::Text(_) => Err(Error::NonNumericParameter(key.to_string())),
        }
    }
}

/// Nested parameter tree exported by a fitted model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Param {
    /// Leaf value
    Scalar(Scalar),
    /// Positional values, flattened by index
    Sequence(Vec<Param>),
    /// Named values, flattened by key in key order
    Mapping(BTreeMap<String, Param>),
}

impl Param {
    /// Numeric leaf
    #[must_use]
    pub const fn number(value: f64) -> Self {
        Self::Scalar(Scalar::Number(value))
    }

    /// Text leaf
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::Text(value.into()))
    }

    /// Boolean leaf
    #[must_use]
    pub const fn flag(value: bool) -> Self {
        Self::Scalar(Scalar::Bool(value))
    }

    /// Null leaf
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Build a sequence node
    #[must_use]
    pub fn sequence(items: impl IntoIterator<Item = Self>) -> Self {
        Self::Sequence(items.into_iter().collect())
    }

    /// Build a mapping node
    #[must_use]
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Self)>) -> Self {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Child of a mapping node
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Mapping(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Numeric value of a leaf
    #[must_use]
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Scalar(Scalar::Number(value)) => Some(*value),
            _ => None,
        }
    }
}
