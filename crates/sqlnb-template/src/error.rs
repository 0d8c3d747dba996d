/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template parsing and evaluation.

use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Error parsing the template syntax.
    #[error("Parse error at byte {offset}: {message}")]
    ParseError { offset: usize, message: String },

    /// I/O error (e.g., reading a template file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            offset,
            message: message.into(),
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
