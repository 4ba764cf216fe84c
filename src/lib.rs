//! # CPA Modeler: Hierarchical Multi-Table Modeling
//!
//! Fits one multivariate model per table of a relational dataset using
//! Conditional Parameter Aggregation (CPA): every child table is split into
//! groups of rows sharing a foreign-key value, a model is fitted per group,
//! and the group model's parameters become extra columns on the matching
//! parent row before the parent's own model is fitted.
//!
//! ## Pipeline
//!
//! - **Imputation**: mean for numeric columns, mode otherwise ([`impute`])
//! - **Encoding**: lower-triangular covariance, log scales ([`params::encode`])
//! - **Flattening**: nested parameters to `__`-joined keys ([`params::flatten`])
//! - **Extension**: one row per foreign-key value ([`modeler::extend`])
//! - **Traversal**: depth-first, post-order over the schema ([`modeler::Modeler`])
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cpa_modeler::metadata::DatasetMetadata;
//! use cpa_modeler::model::GaussianMultivariate;
//! use cpa_modeler::modeler::Modeler;
//!
//! let metadata = DatasetMetadata::load("data/metadata.json")?;
//! let modeler = Modeler::new(&metadata, GaussianMultivariate::new());
//!
//! let registry = modeler.model_database(None)?;
//! for (table, model) in registry.iter() {
//!     println!("{table}: {} columns", model.columns().len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod frame;
pub mod impute;
pub mod metadata;
pub mod model;
pub mod modeler;
pub mod params;
pub mod storage;

pub use error::{Error, Result};
pub use frame::{KeyValue, Tables};
pub use impute::impute;
pub use metadata::{DatasetMetadata, Metadata};
pub use model::{FittedModel, GaussianMultivariate, ModelConfig, ModelFitter};
pub use modeler::{ExtensionFrame, ModelRegistry, Modeler};
