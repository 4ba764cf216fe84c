//! `cpa-model <metadata.json> [model-config.json]`
//!
//! Models every table of a dataset and prints the fitted models as JSON.
//! Log verbosity follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context};
use cpa_modeler::{DatasetMetadata, GaussianMultivariate, ModelConfig, Modeler};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (metadata_path, config_path) = match args.as_slice() {
        [metadata] => (metadata, None),
        [metadata, config] => (metadata, Some(config)),
        _ => bail!("usage: cpa-model <metadata.json> [model-config.json]"),
    };

    let metadata = DatasetMetadata::load(metadata_path)
        .with_context(|| format!("loading metadata from {metadata_path}"))?;

    let config: ModelConfig = match config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading model config {path}"))?;
            serde_json::from_str(&json).with_context(|| format!("parsing model config {path}"))?
        }
        None => ModelConfig::new(),
    };
    let fitter = GaussianMultivariate::from_config(&config)?;

    let registry = Modeler::new(&metadata, fitter)
        .model_database(None)
        .context("modeling dataset")?;

    println!("{}", serde_json::to_string_pretty(&registry)?);
    Ok(())
}
