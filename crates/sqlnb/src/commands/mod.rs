//! Command implementations for the sqlnb CLI
//!
//! Each command module checks its paths, loads the project configuration
//! and delegates to sqlnb-core for the actual work.

pub mod convert;
pub mod eval_sql;
pub mod extract_images;
pub mod student;
pub mod transclude;

use std::path::Path;

use anyhow::{Context, Result};
use sqlnb_core::{Notebook, SqlnbConfig};

/// The input must be an existing file.
pub(crate) fn check_notebook(notebook: &Path) -> Result<()> {
    if !notebook.is_file() {
        anyhow::bail!("Notebook does not exist: {}", notebook.display());
    }
    Ok(())
}

/// The output directory must already exist.
pub(crate) fn check_output_dir(output_path: &Path) -> Result<()> {
    if !output_path.is_dir() {
        anyhow::bail!("Output directory does not exist: {}", output_path.display());
    }
    Ok(())
}

pub(crate) fn read_notebook(notebook: &Path) -> Result<Notebook> {
    check_notebook(notebook)?;
    Notebook::read(notebook).with_context(|| format!("Failed to read {}", notebook.display()))
}

pub(crate) fn load_config(notebook: &Path) -> Result<SqlnbConfig> {
    let config = SqlnbConfig::discover(notebook).context("Failed to load project configuration")?;
    if let Some(path) = &config.path {
        tracing::debug!(config = %path.display(), "Using project configuration");
    }
    Ok(config)
}

pub(crate) fn write_notebook(notebook: &Notebook, output_path: &Path, file_name: &str) -> Result<()> {
    let target = output_path.join(file_name);
    notebook
        .write(&target)
        .with_context(|| format!("Failed to write {}", target.display()))
}
