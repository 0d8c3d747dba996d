/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for the notebook pipeline.
 */

//! Error types for sqlnb-core

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::ExecutionError;

/// Where in the notebook a cell-scoped error happened.
///
/// `index` is the position of the cell in the notebook handed to the stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellLocation {
    pub index: Option<usize>,
    pub tags: Vec<String>,
}

impl CellLocation {
    pub fn new(index: usize, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            index: Some(index),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CellLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, " in cell {index} (tags: [{}])", self.tags.join(", ")),
            None => Ok(()),
        }
    }
}

#[derive(Error, Debug)]
pub enum SqlnbError {
    /// Malformed or unknown tag values, or invalid configuration.
    #[error("Configuration error{location}: {message}")]
    Configuration {
        location: CellLocation,
        message: String,
    },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// A file the pipeline depends on is missing or unusable.
    #[error("Resource error ({}): {message}", .path.display())]
    Resource { path: PathBuf, message: String },

    /// Tagging that breaks a pipeline invariant. Never repaired silently.
    #[error("Invariant violation{location}: {message}")]
    InvariantViolation {
        location: CellLocation,
        message: String,
    },

    /// The markup converter or image renderer failed.
    #[error("Conversion error: {message}")]
    Conversion { message: String },

    #[error("Template error: {0}")]
    Template(#[from] sqlnb_template::TemplateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SqlnbError {
    pub fn configuration(location: CellLocation, message: impl Into<String>) -> Self {
        Self::Configuration {
            location,
            message: message.into(),
        }
    }

    /// A configuration error that is not tied to a cell.
    pub fn config(message: impl Into<String>) -> Self {
        Self::configuration(CellLocation::default(), message)
    }

    pub fn resource(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Resource {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn invariant(location: CellLocation, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            location,
            message: message.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SqlnbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_location_display() {
        let location = CellLocation::new(3, ["sql", "limit:x"]);
        let err = SqlnbError::configuration(location, "malformed row limit");
        assert_eq!(
            err.to_string(),
            "Configuration error in cell 3 (tags: [sql, limit:x]): malformed row limit"
        );
    }

    #[test]
    fn test_config_without_cell() {
        let err = SqlnbError::config("execute.timeout must be positive");
        assert_eq!(
            err.to_string(),
            "Configuration error: execute.timeout must be positive"
        );
    }

    #[test]
    fn test_resource_display() {
        let err = SqlnbError::resource("/tmp/lesson1.ipynb", "file not found");
        assert_eq!(
            err.to_string(),
            "Resource error (/tmp/lesson1.ipynb): file not found"
        );
    }
}
