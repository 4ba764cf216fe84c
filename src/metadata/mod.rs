//! Dataset metadata service
//!
//! The traversal asks a [`Metadata`] implementation for tables, the
//! raw→model-ready column transform, and the parent/child schema graph.
//! [`DatasetMetadata`] is the bundled JSON-configured implementation.

mod dataset;

pub use dataset::{DatasetMetadata, FieldMeta, FieldRef, FieldType, MetadataDocument, TableMeta};

use crate::Result;
use arrow::record_batch::RecordBatch;

/// Schema graph and table access consumed by the modeler
///
/// The schema graph must be a forest: following parent links from any table
/// must end at a root.
pub trait Metadata {
    /// Load a table's raw rows
    ///
    /// # Errors
    /// Returns error if the table is unknown or cannot be read
    fn load_table(&self, name: &str) -> Result<RecordBatch>;

    /// Turn raw columns into model-ready columns, preserving row order
    ///
    /// # Errors
    /// Returns error if the table is unknown or a declared column is missing
    fn transform(&self, name: &str, table: &RecordBatch) -> Result<RecordBatch>;

    /// Primary key column of a table, if declared
    ///
    /// # Errors
    /// Returns error if the table is unknown
    fn get_primary_key(&self, name: &str) -> Result<Option<String>>;

    /// Column of `child` that references `parent`
    ///
    /// # Errors
    /// Returns error if either table is unknown or no such reference exists
    fn get_foreign_key(&self, parent: &str, child: &str) -> Result<String>;

    /// Tables that reference `name`
    ///
    /// # Errors
    /// Returns error if the table is unknown
    fn get_children(&self, name: &str) -> Result<Vec<String>>;

    /// Tables referenced by `name`; empty for a root table
    ///
    /// # Errors
    /// Returns error if the table is unknown
    fn get_parents(&self, name: &str) -> Result<Vec<String>>;

    /// All table names in declaration order
    fn get_tables(&self) -> Vec<String>;
}
