/*
 * extract_images.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * extract-images command implementation
 */

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use sqlnb_core::images::{ChromiumRenderer, extract_images};
use sqlnb_core::pipeline::notebook_stem;

use super::{check_output_dir, load_config, read_notebook};

/// Execute the extract-images command
pub fn execute(notebook_path: &Path, output_path: &Path) -> Result<()> {
    check_output_dir(output_path)?;
    let config = load_config(notebook_path)?;
    let notebook = read_notebook(notebook_path)?;

    let renderer = ChromiumRenderer::from_config(&config)?;
    let basename = notebook_stem(notebook_path)?;
    let images = extract_images(&notebook, output_path, &basename, &renderer)
        .with_context(|| format!("Failed to extract images from {}", notebook_path.display()))?;

    if images.is_empty() {
        info!("No query results in {}", notebook_path.display());
    } else {
        info!(
            "Extracted {} image(s) from {} into {}",
            images.len(),
            notebook_path.display(),
            output_path.join("images").display()
        );
    }
    Ok(())
}
