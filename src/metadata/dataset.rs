//! JSON-configured dataset metadata
//!
//! ```json
//! {
//!   "path": "data",
//!   "tables": [
//!     {"name": "users", "primary_key": "id",
//!      "fields": [{"name": "id", "type": "id"},
//!                 {"name": "age", "type": "numerical"}]},
//!     {"name": "orders", "path": "orders.parquet", "primary_key": "id",
//!      "fields": [{"name": "id", "type": "id"},
//!                 {"name": "user_id", "type": "id",
//!                  "ref": {"table": "users", "field": "id"}},
//!                 {"name": "amount", "type": "numerical"}]}
//!   ]
//! }
//! ```

use super::Metadata;
use crate::frame;
use crate::storage::StorageEngine;
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, StringArray};
use arrow::compute;
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// How a field is modeled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Key column; never modeled
    Id,
    /// Numeric value, modeled as-is
    Numerical,
    /// Discrete label, modeled through its label code
    Categorical,
    /// Flag, modeled as 0/1
    Boolean,
}

/// Reference from a foreign key to its parent table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    /// Parent table name
    pub table: String,
    /// Referenced parent column
    pub field: String,
}

/// Field declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMeta {
    /// Column name
    pub name: String,
    /// Modeling type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Parent reference, making this field a foreign key
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<FieldRef>,
}

/// Table declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    /// Table name
    pub name: String,
    /// Parquet file relative to the dataset root (default `<name>.parquet`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Primary key column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    /// Declared fields in column order
    #[serde(default)]
    pub fields: Vec<FieldMeta>,
}

/// Top-level metadata document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Dataset directory, relative to the document's own location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Tables in declaration order
    pub tables: Vec<TableMeta>,
}

/// Metadata service backed by a [`MetadataDocument`]
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    root: PathBuf,
    tables: Vec<TableMeta>,
}

impl DatasetMetadata {
    /// Validate a document; table paths resolve against `root`
    ///
    /// # Errors
    /// Returns `Error::Metadata` on duplicate tables or fields, references to
    /// unknown tables or fields, or an undeclared primary key
    pub fn new(document: MetadataDocument, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let root = match document.path {
            Some(path) => root.join(path),
            None => root,
        };

        let metadata = Self {
            root,
            tables: document.tables,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or fails validation
    pub fn from_json(json: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let document: MetadataDocument = serde_json::from_str(json)?;
        Self::new(document, root)
    }

    /// Load a JSON document from disk; relative paths resolve against its directory
    ///
    /// # Errors
    /// Returns error if the file cannot be read or fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_json(&json, root)
    }

    /// Declaration of a table
    ///
    /// # Errors
    /// Returns `Error::TableNotFound` for unknown tables
    pub fn table(&self, name: &str) -> Result<&TableMeta> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for table in &self.tables {
            if !names.insert(table.name.as_str()) {
                return Err(Error::Metadata(format!("duplicate table '{}'", table.name)));
            }
        }

        for table in &self.tables {
            let mut fields = HashSet::new();
            for field in &table.fields {
                if !fields.insert(field.name.as_str()) {
                    return Err(Error::Metadata(format!(
                        "duplicate field '{}' in table '{}'",
                        field.name, table.name
                    )));
                }
            }

            if let Some(pk) = &table.primary_key {
                if !fields.contains(pk.as_str()) {
                    return Err(Error::Metadata(format!(
                        "primary key '{pk}' of table '{}' is not a declared field",
                        table.name
                    )));
                }
            }

            for reference in table.fields.iter().filter_map(|f| f.reference.as_ref()) {
                let parent = self.table(&reference.table).map_err(|_| {
                    Error::Metadata(format!(
                        "table '{}' references unknown table '{}'",
                        table.name, reference.table
                    ))
                })?;
                if !parent.fields.iter().any(|f| f.name == reference.field) {
                    return Err(Error::Metadata(format!(
                        "table '{}' references unknown field '{}.{}'",
                        table.name, reference.table, reference.field
                    )));
                }
            }
        }

        Ok(())
    }
}

#[allow(clippy::cast_precision_loss)]
fn label_encode(array: &ArrayRef) -> Result<ArrayRef> {
    let cast = compute::cast(array, &DataType::Utf8)?;
    let labels = cast
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Other("Failed to downcast to StringArray".to_string()))?;

    let categories: Vec<&str> = labels
        .iter()
        .flatten()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let codes: Vec<Option<f64>> = labels
        .iter()
        .map(|label| {
            label.and_then(|l| categories.binary_search(&l).ok().map(|code| code as f64))
        })
        .collect();

    Ok(Arc::new(Float64Array::from(codes)))
}

impl Metadata for DatasetMetadata {
    fn load_table(&self, name: &str) -> Result<RecordBatch> {
        let table = self.table(name)?;
        let file = table
            .path
            .clone()
            .unwrap_or_else(|| format!("{name}.parquet"));
        StorageEngine::load_parquet(self.root.join(file))?.to_table()
    }

    fn transform(&self, name: &str, table: &RecordBatch) -> Result<RecordBatch> {
        let meta = self.table(name)?;
        let mut fields = Vec::new();
        let mut columns = Vec::new();

        for field in &meta.fields {
            let encoded = match field.field_type {
                FieldType::Id => continue,
                FieldType::Numerical | FieldType::Boolean => {
                    compute::cast(frame::column(table, &field.name)?, &DataType::Float64)?
                }
                FieldType::Categorical => label_encode(frame::column(table, &field.name)?)?,
            };
            fields.push(Field::new(&field.name, DataType::Float64, true));
            columns.push(encoded);
        }

        frame::build_batch(fields, columns, table.num_rows())
    }

    fn get_primary_key(&self, name: &str) -> Result<Option<String>> {
        Ok(self.table(name)?.primary_key.clone())
    }

    fn get_foreign_key(&self, parent: &str, child: &str) -> Result<String> {
        self.table(parent)?;
        self.table(child)?
            .fields
            .iter()
            .find(|f| f.reference.as_ref().is_some_and(|r| r.table == parent))
            .map(|f| f.name.clone())
            .ok_or_else(|| {
                Error::Metadata(format!("table '{child}' has no reference to '{parent}'"))
            })
    }

    fn get_children(&self, name: &str) -> Result<Vec<String>> {
        self.table(name)?;
        Ok(self
            .tables
            .iter()
            .filter(|t| {
                t.fields
                    .iter()
                    .any(|f| f.reference.as_ref().is_some_and(|r| r.table == name))
            })
            .map(|t| t.name.clone())
            .collect())
    }

    fn get_parents(&self, name: &str) -> Result<Vec<String>> {
        let mut parents: Vec<String> = Vec::new();
        for reference in self.table(name)?.fields.iter().filter_map(|f| f.reference.as_ref()) {
            if !parents.contains(&reference.table) {
                parents.push(reference.table.clone());
            }
        }
        Ok(parents)
    }

    fn get_tables(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}
