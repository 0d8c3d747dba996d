/*
 * engine/context.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Execution context for engines.
 */

//! Execution context for engines.

use std::path::PathBuf;
use std::time::Duration;

/// Default per-cell execution bound.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Context provided to execution engines.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Working directory for execution.
    ///
    /// Relative paths in code cells resolve against it. The executed
    /// notebook is written here too.
    pub cwd: PathBuf,

    /// Time allowed for a single cell.
    pub timeout: Duration,

    /// Kernel to run cells with.
    pub kernel: String,
}

impl ExecutionContext {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            timeout: DEFAULT_TIMEOUT,
            kernel: "python3".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_kernel(mut self, kernel: impl Into<String>) -> Self {
        self.kernel = kernel.into();
        self
    }
}
