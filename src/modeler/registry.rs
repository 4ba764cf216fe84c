//! Fitted models by table name

use crate::model::FittedModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One fitted model per table, filled in as the traversal completes tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    models: BTreeMap<String, FittedModel>,
}

impl ModelRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a table's model, returning the model it replaced
    pub fn insert(&mut self, table: impl Into<String>, model: FittedModel) -> Option<FittedModel> {
        self.models.insert(table.into(), model)
    }

    /// Model of a table
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&FittedModel> {
        self.models.get(table)
    }

    /// Number of modeled tables
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// True if no table has been modeled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Modeled table names in sorted order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Models in table-name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FittedModel)> {
        self.models.iter().map(|(k, v)| (k.as_str(), v))
    }
}
