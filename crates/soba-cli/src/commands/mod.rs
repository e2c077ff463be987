//! Subcommand implementations

pub mod check;
pub mod new;

use std::path::Path;

use soba_engine::{Runtime, RuntimeOptions};

/// Build the runtime from `--config`, or defaults
pub fn runtime(config: Option<&Path>) -> anyhow::Result<Runtime> {
    let options = match config {
        Some(path) => RuntimeOptions::load(path)?,
        None => RuntimeOptions::default(),
    };
    tracing::debug!(?options, "cli: runtime options");
    Ok(Runtime::with_options(options)?)
}
