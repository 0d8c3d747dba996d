/*
 * engine/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Execution engine infrastructure.
 */

//! Execution engines.
//!
//! The pipeline never runs code itself. Once SQL cells have been compiled,
//! the notebook is handed to an [`ExecutionEngine`], which returns it with
//! outputs attached. [`NbconvertEngine`] drives `jupyter nbconvert`; tests
//! substitute in-process fakes.

mod context;
mod error;
mod nbconvert;
mod traits;

pub use context::{DEFAULT_TIMEOUT, ExecutionContext};
pub use error::ExecutionError;
pub use nbconvert::NbconvertEngine;
pub use traits::ExecutionEngine;
