/*
 * stage.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Notebook stage pipeline infrastructure.
 */

//! Notebook stage pipeline infrastructure.
//!
//! - [`NotebookStage`] - a whole-notebook transformation (cells in, cells out)
//! - [`StagePipeline`] - ordered collection of stages to run
//!
//! Stages never share state with each other; the only thing a stage sees of
//! its predecessors is the tags they left on the cells. Each CLI operation
//! builds its own pipeline (see [`crate::pipeline`]).
//!
//! # Example
//!
//! ```ignore
//! use sqlnb_core::codegen::CodeGenerator;
//! use sqlnb_core::config::SessionSettings;
//! use sqlnb_core::stage::StagePipeline;
//! use sqlnb_core::stages::{SqlCompileStage, ReclassifyStage};
//!
//! let generator = CodeGenerator::new(uri, SessionSettings::default());
//! let mut pipeline = StagePipeline::new();
//! pipeline.push(Box::new(SqlCompileStage::new(generator)));
//! pipeline.push(Box::new(ReclassifyStage));
//!
//! let notebook = pipeline.execute(notebook)?;
//! ```

use crate::Result;
use crate::notebook::Notebook;

/// A notebook-to-notebook transformation.
///
/// Stages take the notebook by value and hand back the transformed one, so
/// nothing else can observe a notebook while a stage is working on it.
pub trait NotebookStage: Send + Sync {
    /// Human-readable name for this stage.
    ///
    /// Used for logging and debugging.
    fn name(&self) -> &str;

    /// Apply the stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot process the notebook; the
    /// notebook is consumed either way.
    fn run(&self, notebook: Notebook) -> Result<Notebook>;
}

/// A pipeline of stages to execute in order.
pub struct StagePipeline {
    stages: Vec<Box<dyn NotebookStage>>,
}

impl StagePipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Add a stage. Stages run in the order they are added.
    pub fn push(&mut self, stage: Box<dyn NotebookStage>) {
        self.stages.push(stage);
    }

    pub fn extend(&mut self, stages: impl IntoIterator<Item = Box<dyn NotebookStage>>) {
        self.stages.extend(stages);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run all stages in insertion order.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered. Execution stops on error.
    pub fn execute(&self, notebook: Notebook) -> Result<Notebook> {
        let mut notebook = notebook;
        for stage in &self.stages {
            tracing::debug!(
                stage = stage.name(),
                cells = notebook.cells.len(),
                "Running stage"
            );
            notebook = stage.run(notebook)?;
        }
        Ok(notebook)
    }

    /// Names of all stages in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new()
    }
}
