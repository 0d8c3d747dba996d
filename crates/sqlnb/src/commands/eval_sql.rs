/*
 * eval_sql.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * eval-sql command implementation
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use sqlnb_core::codegen::CodeGenerator;
use sqlnb_core::engine::{ExecutionContext, ExecutionEngine, NbconvertEngine};
use sqlnb_core::pipeline::{eval_sql_pipeline, output_file_name};

use super::{check_output_dir, load_config, read_notebook, write_notebook};

/// Arguments for the eval-sql command
#[derive(Debug)]
pub struct EvalSqlArgs {
    /// SQLAlchemy connection string
    pub db: String,
    pub notebook: PathBuf,
    pub output_path: PathBuf,
    /// Explicit output file name
    pub out: Option<String>,
}

/// Execute the eval-sql command
pub fn execute(args: EvalSqlArgs) -> Result<()> {
    check_output_dir(&args.output_path)?;
    let config = load_config(&args.notebook)?;
    let notebook = read_notebook(&args.notebook)?;

    let engine = NbconvertEngine::from_config(&config);
    if !engine.is_available() {
        anyhow::bail!("jupyter not found (set SQLNB_JUPYTER or binaries.jupyter)");
    }

    let generator = CodeGenerator::new(args.db, config.session.clone());
    let context = ExecutionContext::new(&args.output_path)
        .with_timeout(config.timeout())
        .with_kernel(config.execute.kernel.clone());

    let evaluated = eval_sql_pipeline(generator, Arc::new(engine), context)
        .execute(notebook)
        .with_context(|| format!("Failed to evaluate {}", args.notebook.display()))?;

    let file_name = output_file_name(&args.notebook, "_evaluated", args.out.as_deref())?;
    write_notebook(&evaluated, &args.output_path, &file_name)?;

    info!(
        "Successfully evaluated {} and saved it into {}",
        args.notebook.display(),
        file_name
    );
    Ok(())
}
