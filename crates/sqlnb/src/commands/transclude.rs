/*
 * transclude.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * transclude command implementation
 */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use sqlnb_core::pipeline::{output_file_name, transclude_pipeline};

use super::{check_output_dir, read_notebook, write_notebook};

/// Arguments for the transclude command
#[derive(Debug)]
pub struct TranscludeArgs {
    pub notebook: PathBuf,
    pub output_path: PathBuf,
    pub out: Option<String>,
    /// Expand references inside transcluded notebooks
    pub recursive: bool,
}

/// Execute the transclude command
///
/// References are resolved relative to the notebook's directory.
pub fn execute(args: TranscludeArgs) -> Result<()> {
    check_output_dir(&args.output_path)?;
    let notebook = read_notebook(&args.notebook)?;

    let base = args
        .notebook
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let resolved = transclude_pipeline(base, args.recursive, Some(args.notebook.clone()))
        .execute(notebook)
        .with_context(|| format!("Failed to transclude {}", args.notebook.display()))?;

    let file_name = output_file_name(&args.notebook, "_transcluded", args.out.as_deref())?;
    write_notebook(&resolved, &args.output_path, &file_name)?;

    info!(
        "Resolved transclusions in {} and saved it into {}",
        args.notebook.display(),
        file_name
    );
    Ok(())
}
