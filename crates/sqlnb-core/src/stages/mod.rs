/*
 * stages/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Notebook pipeline stages.
 */

//! Notebook pipeline stages.
//!
//! Each stage is a plain function over a [`Notebook`](crate::notebook::Notebook)
//! plus a [`NotebookStage`](crate::stage::NotebookStage) wrapper for use in
//! a [`StagePipeline`](crate::stage::StagePipeline).

pub mod execute;
pub mod reclassify;
pub mod sql_compile;
pub mod student;
pub mod transclude;

pub use execute::ExecuteStage;
pub use reclassify::{ReclassifyStage, reclassify};
pub use sql_compile::{SqlCompileStage, compile, compile_with};
pub use student::{StudentFilterStage, filter_student};
pub use transclude::{TranscludeStage, resolve_recursive, resolve_transclusion};
