/*
 * convert.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * convert command implementation
 */

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use sqlnb_core::convert::PandocConverter;
use sqlnb_core::emit::EmitMode;
use sqlnb_core::pipeline::{ConvertOptions, convert_notebook, document_file_name, notebook_stem};
use sqlnb_core::templates::load_template;

use super::{check_output_dir, load_config, read_notebook};

/// Arguments for the convert command
#[derive(Debug)]
pub struct ConvertArgs {
    pub notebook: PathBuf,
    pub output_path: PathBuf,
    /// Template file replacing the built-in one
    pub template: Option<PathBuf>,
    pub mode: EmitMode,
}

/// Execute the convert command
pub fn execute(args: ConvertArgs) -> Result<()> {
    check_output_dir(&args.output_path)?;
    let config = load_config(&args.notebook)?;
    let notebook = read_notebook(&args.notebook)?;

    let template = load_template(args.template.as_deref(), args.mode.template_name())
        .context("Failed to load template")?;
    let converter = PandocConverter::from_config(&config);
    let basename = notebook_stem(&args.notebook)?;

    let options = ConvertOptions {
        mode: args.mode,
        output: &args.output_path,
        image_basename: &basename,
        source: Some(args.notebook.as_path()),
    };
    let document = convert_notebook(&notebook, &options, &converter, &template)
        .with_context(|| format!("Failed to convert {}", args.notebook.display()))?;

    let file_name = document_file_name(&args.notebook, args.mode)?;
    let target = args.output_path.join(&file_name);
    std::fs::write(&target, document)
        .with_context(|| format!("Failed to write {}", target.display()))?;

    info!(
        "Converted {} to {} ({})",
        args.notebook.display(),
        file_name,
        args.mode
    );
    Ok(())
}
