/*
 * pipeline.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-operation pipelines and output naming.
 */

//! Per-operation pipelines.
//!
//! Each CLI operation runs a fixed list of stages:
//!
//! | operation  | stages                                  |
//! |------------|-----------------------------------------|
//! | `eval-sql` | sql-compile → execute → reclassify      |
//! | `student`  | student-filter                          |
//! | `transclude` | transclude (or transclude-recursive)  |
//!
//! `convert` and `extract-images` only read the notebook, so they are plain
//! functions ([`convert_notebook`], [`crate::images::extract_images`]).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlnb_template::Template;

use crate::Result;
use crate::codegen::CodeGenerator;
use crate::convert::MarkupConverter;
use crate::emit::{EmitMode, emit};
use crate::engine::{ExecutionContext, ExecutionEngine};
use crate::error::SqlnbError;
use crate::notebook::Notebook;
use crate::render::{FrontMatter, render_document};
use crate::stage::StagePipeline;
use crate::stages::{
    ExecuteStage, ReclassifyStage, SqlCompileStage, StudentFilterStage, TranscludeStage,
};

pub const NOTEBOOK_EXTENSION: &str = "ipynb";

pub fn eval_sql_pipeline(
    generator: CodeGenerator,
    engine: Arc<dyn ExecutionEngine>,
    context: ExecutionContext,
) -> StagePipeline {
    let mut pipeline = StagePipeline::new();
    pipeline.push(Box::new(SqlCompileStage::new(generator)));
    pipeline.push(Box::new(ExecuteStage::new(engine, context)));
    pipeline.push(Box::new(ReclassifyStage));
    pipeline
}

pub fn student_pipeline() -> StagePipeline {
    let mut pipeline = StagePipeline::new();
    pipeline.push(Box::new(StudentFilterStage));
    pipeline
}

/// `origin` is the notebook being resolved; it seeds cycle detection.
pub fn transclude_pipeline(base: &Path, recursive: bool, origin: Option<PathBuf>) -> StagePipeline {
    let stage = TranscludeStage::new(base);
    let stage = if recursive {
        stage.recursive(origin)
    } else {
        stage
    };
    let mut pipeline = StagePipeline::new();
    pipeline.push(Box::new(stage));
    pipeline
}

/// Options for [`convert_notebook`].
pub struct ConvertOptions<'a> {
    pub mode: EmitMode,
    /// Directory the images live under (`<output>/images/...`).
    pub output: &'a Path,
    pub image_basename: &'a str,
    /// The notebook's own path, for the default `name`.
    pub source: Option<&'a Path>,
}

/// Emit and render a whole document.
pub fn convert_notebook(
    notebook: &Notebook,
    options: &ConvertOptions<'_>,
    converter: &dyn MarkupConverter,
    template: &Template,
) -> Result<String> {
    let cells = emit(
        options.mode,
        notebook,
        options.output,
        options.image_basename,
        converter,
    )?;
    let front_matter = FrontMatter::from_notebook(notebook, options.source);
    render_document(template, &front_matter, &cells)
}

/// The notebook's stem, used for derived file names and image names.
pub fn notebook_stem(input: &Path) -> Result<String> {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SqlnbError::resource(input, "notebook path has no file name"))
}

/// Output file name for a notebook-producing operation.
///
/// An explicit name gets `.ipynb` appended when missing; otherwise the
/// input stem is suffixed (`ex1.ipynb` → `ex1_evaluated.ipynb`).
pub fn output_file_name(input: &Path, suffix: &str, explicit: Option<&str>) -> Result<String> {
    match explicit {
        Some(name) if name.ends_with(&format!(".{NOTEBOOK_EXTENSION}")) => Ok(name.to_string()),
        Some(name) => Ok(format!("{name}.{NOTEBOOK_EXTENSION}")),
        None => Ok(format!("{}{suffix}.{NOTEBOOK_EXTENSION}", notebook_stem(input)?)),
    }
}

/// Output file name for `convert` (`ex1.ipynb` → `ex1.tex`).
pub fn document_file_name(input: &Path, mode: EmitMode) -> Result<String> {
    Ok(format!("{}.{}", notebook_stem(input)?, mode.extension()))
}
