/*
 * convert.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Markup conversion for narrative cells.
 */

//! Markup conversion for narrative cells.

use std::path::PathBuf;
use std::time::Duration;

use crate::Result;
use crate::config::SqlnbConfig;
use crate::error::SqlnbError;
use crate::process::{ProcessFailure, run_with_timeout};

/// Bound on a single pandoc run. Cells are small; this only catches hangs.
const PANDOC_TIMEOUT: Duration = Duration::from_secs(60);

/// Converts narrative markup (Markdown) into a target markup.
pub trait MarkupConverter: Send + Sync {
    fn name(&self) -> &str;

    /// Convert `source` to `target` (`latex` or `markdown`).
    fn convert(&self, source: &str, target: &str) -> Result<String>;
}

/// Converts through the `pandoc` executable.
#[derive(Debug, Clone)]
pub struct PandocConverter {
    pandoc: Option<PathBuf>,
}

impl PandocConverter {
    pub fn new(pandoc: Option<PathBuf>) -> Self {
        Self { pandoc }
    }

    pub fn from_config(config: &SqlnbConfig) -> Self {
        Self::new(config.pandoc())
    }
}

impl MarkupConverter for PandocConverter {
    fn name(&self) -> &str {
        "pandoc"
    }

    fn convert(&self, source: &str, target: &str) -> Result<String> {
        let pandoc = self.pandoc.as_ref().ok_or_else(|| {
            SqlnbError::conversion("pandoc not found (set SQLNB_PANDOC or binaries.pandoc)")
        })?;

        tracing::debug!(target_format = target, bytes = source.len(), "Running pandoc");
        let output = run_with_timeout(
            pandoc,
            ["-f", "markdown", "-t", target],
            None,
            Some(source.as_bytes()),
            PANDOC_TIMEOUT,
        )
        .map_err(|failure| match failure {
            ProcessFailure::Timeout(d) => {
                SqlnbError::conversion(format!("pandoc timed out after {}s", d.as_secs()))
            }
            other => SqlnbError::conversion(format!("cannot run pandoc: {other}")),
        })?;

        if !output.status.success() {
            return Err(SqlnbError::conversion(format!(
                "pandoc failed converting to {target}: {}",
                output.stderr_lossy().trim()
            )));
        }
        Ok(output.stdout_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_pandoc() {
        let converter = PandocConverter::new(None);
        assert!(matches!(
            converter.convert("# Title", "latex"),
            Err(SqlnbError::Conversion { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_converter_reports_stderr() {
        // `false` ignores its arguments and exits non-zero.
        let converter = PandocConverter::new(Some(PathBuf::from("false")));
        match converter.convert("text", "latex") {
            Err(SqlnbError::Conversion { message }) => {
                assert!(message.contains("pandoc failed converting to latex"))
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }
}
