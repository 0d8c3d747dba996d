/*
 * engine/error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for execution engines.
 */

//! Error types for execution engines.

use thiserror::Error;

/// Errors that can occur during engine execution.
///
/// All of these are fatal for the run. A query failure inside an
/// `except`-tagged cell never reaches this type: the generated code catches
/// it and prints the message as ordinary cell output.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Execution did not finish within the allowed time.
    #[error("Execution timed out after {seconds}s")]
    Timeout {
        /// The bound that was exceeded
        seconds: u64,
    },

    /// The engine is available but the required runtime is not installed.
    #[error("Engine runtime not found: {engine} requires {runtime}")]
    RuntimeNotFound {
        /// The engine that requires the runtime
        engine: String,
        /// The runtime that was not found
        runtime: String,
    },

    /// The kernel failed to start or a cell raised an uncaught error.
    #[error("Execution failed in {engine}: {message}")]
    KernelFailed {
        /// The engine that failed
        engine: String,
        /// Error message from the engine
        message: String,
    },

    /// IO error during execution.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl ExecutionError {
    pub fn runtime_not_found(engine: impl Into<String>, runtime: impl Into<String>) -> Self {
        Self::RuntimeNotFound {
            engine: engine.into(),
            runtime: runtime.into(),
        }
    }

    pub fn kernel_failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KernelFailed {
            engine: engine.into(),
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}
