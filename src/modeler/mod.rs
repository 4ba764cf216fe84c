//! Conditional Parameter Aggregation (CPA)
//!
//! Tables are modeled depth-first, post-order. Before a parent table is
//! fitted, every child table is resolved (with its own children already
//! merged in), summarized per foreign-key group by [`extend`], and
//! left-merged onto the parent rows. The parent's model is then fitted over
//! its own columns plus all child-summary columns.
//!
//! ```text
//! users ──< orders ──< items
//!
//! cpa(users)
//!   cpa(orders, fk = user_id)
//!     cpa(items, fk = order_id)      -> items rows + order_id
//!     extend(items by order_id)      -> merged onto orders
//!     fit(orders + __items__*)
//!   extend(orders by user_id)        -> merged onto users
//!   fit(users + __orders__*)
//! ```
//!
//! The schema graph must be acyclic; a cycle recurses without bound.

mod extension;
mod registry;

pub use extension::{extend, prefixed, ExtensionFrame, CHILD_ROWS};
pub use registry::ModelRegistry;

use crate::frame::{self, Tables};
use crate::impute::impute;
use crate::metadata::Metadata;
use crate::model::{FittedModel, ModelFitter};
use crate::params::{encode, flatten, FlatParams};
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use tracing::info;

/// Impute, then fit
pub(crate) fn fit_model<F: ModelFitter + ?Sized>(
    fitter: &F,
    data: &RecordBatch,
) -> Result<FittedModel> {
    fitter.fit(&impute(data)?)
}

/// Fit a model and turn its encoded parameters into a flat map
pub(crate) fn model_params<F: ModelFitter + ?Sized>(
    fitter: &F,
    data: &RecordBatch,
) -> Result<FlatParams> {
    let model = fit_model(fitter, data)?;
    Ok(flatten(&encode(&model.to_params())?))
}

/// Runs CPA over a dataset described by a [`Metadata`] service
pub struct Modeler<'a, M, F> {
    metadata: &'a M,
    fitter: F,
}

impl<'a, M: Metadata, F: ModelFitter> Modeler<'a, M, F> {
    /// Create a modeler over `metadata` fitting every table and group with `fitter`
    #[must_use]
    pub const fn new(metadata: &'a M, fitter: F) -> Self {
        Self { metadata, fitter }
    }

    /// Model every table reachable from a root table
    ///
    /// Roots are visited in the metadata's table order. Tables are read from
    /// `tables` when given, otherwise loaded through the metadata service.
    ///
    /// # Errors
    /// Any failure while modeling any table aborts the whole run
    pub fn model_database(&self, tables: Option<&Tables>) -> Result<ModelRegistry> {
        let mut registry = ModelRegistry::new();

        for table_name in self.metadata.get_tables() {
            if self.metadata.get_parents(&table_name)?.is_empty() {
                self.cpa(&mut registry, &table_name, tables, None)?;
            }
        }

        info!(tables = registry.len(), "Modeling complete");
        Ok(registry)
    }

    /// Model `table_name` and, recursively, its children
    ///
    /// Returns the table's model-ready frame with its child extensions
    /// merged in and its primary key restored as the first column. Missing
    /// values are kept for a root call. When called for a child
    /// (`foreign_key` given) the frame is the imputed one the table's model
    /// was fitted on, with the foreign-key column attached so the caller can
    /// group by it.
    ///
    /// # Errors
    /// Returns error if a table cannot be resolved, a key column is missing
    /// or unusable, or imputing, fitting or encoding any model fails
    pub fn cpa(
        &self,
        registry: &mut ModelRegistry,
        table_name: &str,
        tables: Option<&Tables>,
        foreign_key: Option<&str>,
    ) -> Result<RecordBatch> {
        info!(table = table_name, "Modeling table");

        let table = match tables {
            Some(tables) => tables
                .get(table_name)
                .cloned()
                .ok_or_else(|| Error::TableNotFound(table_name.to_string()))?,
            None => self.metadata.load_table(table_name)?,
        };

        let mut extended = self.metadata.transform(table_name, &table)?;

        let primary_key = self.metadata.get_primary_key(table_name)?;
        if let Some(primary_key) = &primary_key {
            let children = self.metadata.get_children(table_name)?;
            if !children.is_empty() {
                let index = frame::key_values(&table, primary_key)?;
                for child_name in children {
                    let child_key = self.metadata.get_foreign_key(table_name, &child_name)?;
                    let child_table = self.cpa(registry, &child_name, tables, Some(&child_key))?;
                    let extension = extend(&self.fitter, &child_table, &child_name, &child_key)?;
                    extended = extension.merge_onto(&extended, &index)?;
                }
            }
        }

        let imputed = impute(&extended)?;
        registry.insert(table_name, self.fitter.fit(&imputed)?);

        // A parent groups this frame by foreign key; hand it the imputed rows
        // so a group never sees a column the table level already filled
        if foreign_key.is_some() {
            extended = imputed;
        }

        if let Some(primary_key) = &primary_key {
            let keys = frame::column(&table, primary_key)?.clone();
            extended = frame::insert_column(&extended, 0, primary_key, keys)?;
        }

        if let Some(foreign_key) = foreign_key {
            let keys = frame::column(&table, foreign_key)?.clone();
            extended = frame::set_column(&extended, foreign_key, keys)?;
        }

        Ok(extended)
    }
}
