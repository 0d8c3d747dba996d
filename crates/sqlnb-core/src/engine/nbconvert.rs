/*
 * engine/nbconvert.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Execution through `jupyter nbconvert`.
 */

//! Execution through `jupyter nbconvert --execute`.
//!
//! The notebook is written to a hidden temporary file in the working
//! directory (so relative paths in cells behave as they would in Jupyter),
//! executed with the configured kernel, and read back from nbconvert's
//! standard output.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use super::context::ExecutionContext;
use super::error::ExecutionError;
use super::traits::ExecutionEngine;
use crate::config::SqlnbConfig;
use crate::notebook::Notebook;
use crate::process::{ProcessFailure, run_with_timeout};

const ENGINE_NAME: &str = "nbconvert";

/// Runs notebooks with `jupyter nbconvert`.
#[derive(Debug, Clone)]
pub struct NbconvertEngine {
    jupyter: Option<PathBuf>,
}

impl NbconvertEngine {
    pub fn new(jupyter: Option<PathBuf>) -> Self {
        Self { jupyter }
    }

    pub fn from_config(config: &SqlnbConfig) -> Self {
        Self::new(config.jupyter())
    }

    /// Command-line arguments for one run.
    fn arguments(&self, input: &std::path::Path, ctx: &ExecutionContext) -> Vec<String> {
        vec![
            "nbconvert".to_string(),
            "--to".to_string(),
            "notebook".to_string(),
            "--execute".to_string(),
            "--stdout".to_string(),
            format!("--ExecutePreprocessor.timeout={}", ctx.timeout.as_secs()),
            format!("--ExecutePreprocessor.kernel_name={}", ctx.kernel),
            input.display().to_string(),
        ]
    }
}

/// The per-cell bound applies to each code cell, plus one for kernel start.
fn overall_bound(notebook: &Notebook, per_cell: Duration) -> Duration {
    let code_cells = notebook.cells.iter().filter(|c| c.is_code()).count();
    per_cell.saturating_mul(u32::try_from(code_cells + 1).unwrap_or(u32::MAX))
}

/// Keep the tail of nbconvert's stderr, where the actual error is.
fn error_summary(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(8);
    lines[start..].join("\n")
}

impl ExecutionEngine for NbconvertEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn is_available(&self) -> bool {
        self.jupyter.is_some()
    }

    fn execute(
        &self,
        notebook: Notebook,
        ctx: &ExecutionContext,
    ) -> Result<Notebook, ExecutionError> {
        let jupyter = self
            .jupyter
            .as_ref()
            .ok_or_else(|| ExecutionError::runtime_not_found(ENGINE_NAME, "jupyter"))?;

        let json = notebook
            .to_json()
            .map_err(|e| ExecutionError::other(format!("cannot serialize notebook: {e}")))?;
        let mut input = tempfile::Builder::new()
            .prefix(".sqlnb-")
            .suffix(".ipynb")
            .tempfile_in(&ctx.cwd)?;
        input.write_all(json.as_bytes())?;
        input.flush()?;

        let bound = overall_bound(&notebook, ctx.timeout);
        tracing::info!(
            jupyter = %jupyter.display(),
            kernel = %ctx.kernel,
            timeout_secs = bound.as_secs(),
            "Executing notebook"
        );

        let output = run_with_timeout(
            jupyter,
            self.arguments(input.path(), ctx),
            Some(&ctx.cwd),
            None,
            bound,
        )
        .map_err(|failure| match failure {
            ProcessFailure::Timeout(d) => ExecutionError::Timeout {
                seconds: d.as_secs(),
            },
            ProcessFailure::Spawn { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                ExecutionError::runtime_not_found(ENGINE_NAME, "jupyter")
            }
            ProcessFailure::Spawn { source, .. } | ProcessFailure::Io(source) => {
                ExecutionError::Io(source)
            }
        })?;

        if !output.status.success() {
            let stderr = output.stderr_lossy();
            if stderr.contains("CellTimeoutError") || stderr.contains("TimeoutError") {
                return Err(ExecutionError::Timeout {
                    seconds: ctx.timeout.as_secs(),
                });
            }
            return Err(ExecutionError::kernel_failed(
                ENGINE_NAME,
                error_summary(&stderr),
            ));
        }

        Notebook::from_json(&output.stdout_lossy())
            .map_err(|e| ExecutionError::other(format!("cannot parse executed notebook: {e}")))
    }
}
