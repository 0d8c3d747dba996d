/*
 * engine/traits.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * ExecutionEngine trait definition.
 */

//! ExecutionEngine trait for running notebook code cells.

use super::context::ExecutionContext;
use super::error::ExecutionError;
use crate::notebook::Notebook;

/// Execution engine for notebook code cells.
///
/// Engines take a notebook whose code cells are ready to run and return
/// the same notebook with `outputs` populated. Cell order, sources and tags
/// must come back unchanged.
///
/// # Thread Safety
///
/// Engines must be `Send + Sync`; separate notebooks may be executed on
/// separate threads.
///
/// # Example
///
/// ```ignore
/// use sqlnb_core::engine::{ExecutionEngine, ExecutionContext, ExecutionError};
///
/// struct EchoEngine;
///
/// impl ExecutionEngine for EchoEngine {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn execute(
///         &self,
///         notebook: Notebook,
///         ctx: &ExecutionContext,
///     ) -> Result<Notebook, ExecutionError> {
///         Ok(notebook)
///     }
/// }
/// ```
pub trait ExecutionEngine: Send + Sync {
    /// Human-readable name for this engine.
    ///
    /// Used in log messages and error reports.
    fn name(&self) -> &str;

    /// Execute every code cell of the notebook.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError` if:
    /// - The engine runtime is not available
    /// - The kernel fails or a cell raises
    /// - Execution exceeds the context's timeout
    fn execute(
        &self,
        notebook: Notebook,
        ctx: &ExecutionContext,
    ) -> Result<Notebook, ExecutionError>;

    /// Check if this engine can run in the current environment.
    ///
    /// Default: `true` (assume available)
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::{Cell, CellKind, CellOutput};
    use crate::tags::TagSet;

    /// Answers every code cell with its own source.
    struct EchoEngine;

    impl ExecutionEngine for EchoEngine {
        fn name(&self) -> &str {
            "echo"
        }

        fn execute(
            &self,
            mut notebook: Notebook,
            _ctx: &ExecutionContext,
        ) -> Result<Notebook, ExecutionError> {
            for cell in &mut notebook.cells {
                let source = cell.source.clone();
                if let CellKind::Code { outputs } = &mut cell.kind {
                    outputs.push(CellOutput::stdout(source));
                }
            }
            Ok(notebook)
        }
    }

    #[test]
    fn test_engine_via_trait_object() {
        let engine: Box<dyn ExecutionEngine> = Box::new(EchoEngine);
        assert_eq!(engine.name(), "echo");
        assert!(engine.is_available());

        let nb = Notebook::new(vec![
            Cell::markdown("text", TagSet::new()),
            Cell::code("print(1)", TagSet::new()),
        ]);
        let executed = engine.execute(nb, &ExecutionContext::new(".")).unwrap();
        assert!(executed.cells[0].outputs().is_empty());
        assert_eq!(
            executed.cells[1].outputs()[0].text_payload().as_deref(),
            Some("print(1)")
        );
    }
}
