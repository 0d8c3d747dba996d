/*
 * student.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * student command implementation
 */

use std::path::Path;

use anyhow::Result;
use tracing::info;

use sqlnb_core::pipeline::{output_file_name, student_pipeline};

use super::{check_output_dir, read_notebook, write_notebook};

/// Execute the student command
pub fn execute(notebook_path: &Path, output_path: &Path, out: Option<&str>) -> Result<()> {
    check_output_dir(output_path)?;
    let notebook = read_notebook(notebook_path)?;

    let student = student_pipeline().execute(notebook)?;

    let file_name = output_file_name(notebook_path, "_student", out)?;
    write_notebook(&student, output_path, &file_name)?;

    info!(
        "Successfully extracted the student version from {} and saved it into {}",
        notebook_path.display(),
        file_name
    );
    Ok(())
}
