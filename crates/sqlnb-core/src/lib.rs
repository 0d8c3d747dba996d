//! Tag-driven pipeline for SQL teaching notebooks.
//!
//! Authors write exercises as Jupyter notebooks whose SQL cells carry tags
//! (`sql`, `limit:5`, `except`, `correction`, ...). This crate turns such a
//! notebook into its derived artifacts: an evaluated notebook with query
//! results, a student version without solutions, a notebook with
//! transclusions resolved, and LaTeX/Markdown documents with result tables
//! as images or HTML.
//!
//! # Architecture
//!
//! - [`notebook`] - the document model ([`Notebook`], [`notebook::Cell`])
//! - [`tags`] - tag vocabulary and the per-cell SQL lifecycle
//! - [`stage`] - [`stage::NotebookStage`] and [`stage::StagePipeline`]
//! - [`stages`] - SQL compilation, execution, reclassification, student
//!   filter, transclusion
//! - [`solution`] - solution-run labelling for the emitters
//! - [`emit`] / [`render`] - projection to LaTeX or Markdown and templating
//! - [`engine`], [`convert`], [`images`] - external collaborators
//!   (Jupyter, pandoc, headless Chromium)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sqlnb_core::{Notebook, SqlnbConfig};
//! use sqlnb_core::codegen::CodeGenerator;
//! use sqlnb_core::engine::{ExecutionContext, NbconvertEngine};
//! use sqlnb_core::pipeline::eval_sql_pipeline;
//!
//! let config = SqlnbConfig::discover(path)?;
//! let generator = CodeGenerator::new("oracle://scott:tiger@db/XE", config.session.clone());
//! let engine = Arc::new(NbconvertEngine::from_config(&config));
//! let ctx = ExecutionContext::new(".").with_timeout(config.timeout());
//!
//! let evaluated = eval_sql_pipeline(generator, engine, ctx).execute(Notebook::read(path)?)?;
//! ```

pub mod codegen;
pub mod config;
pub mod convert;
pub mod emit;
pub mod engine;
pub mod error;
pub mod images;
pub mod notebook;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod solution;
pub mod stage;
pub mod stages;
pub mod tags;
pub mod templates;

pub use config::SqlnbConfig;
pub use error::{Result, SqlnbError};
pub use notebook::Notebook;
