/*
 * stages/execute.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Hands the compiled notebook to an execution engine.
 */

use std::sync::Arc;

use crate::Result;
use crate::engine::{ExecutionContext, ExecutionEngine, ExecutionError};
use crate::notebook::Notebook;
use crate::stage::NotebookStage;

/// Runs the notebook through an [`ExecutionEngine`].
///
/// The engine must hand back exactly the cells it was given; anything else
/// would break the cell order the following stages rely on.
pub struct ExecuteStage {
    engine: Arc<dyn ExecutionEngine>,
    context: ExecutionContext,
}

impl ExecuteStage {
    pub fn new(engine: Arc<dyn ExecutionEngine>, context: ExecutionContext) -> Self {
        Self { engine, context }
    }
}

impl NotebookStage for ExecuteStage {
    fn name(&self) -> &str {
        "execute"
    }

    fn run(&self, notebook: Notebook) -> Result<Notebook> {
        let expected = notebook.cells.len();
        tracing::info!(engine = self.engine.name(), cells = expected, "Executing notebook");
        let executed = self.engine.execute(notebook, &self.context)?;
        if executed.cells.len() != expected {
            return Err(ExecutionError::other(format!(
                "{} returned {} cells for a notebook of {expected}",
                self.engine.name(),
                executed.cells.len()
            ))
            .into());
        }
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlnbError;
    use crate::notebook::Cell;
    use crate::tags::TagSet;

    struct DroppingEngine;

    impl ExecutionEngine for DroppingEngine {
        fn name(&self) -> &str {
            "dropping"
        }

        fn execute(
            &self,
            mut notebook: Notebook,
            _ctx: &ExecutionContext,
        ) -> std::result::Result<Notebook, ExecutionError> {
            notebook.cells.pop();
            Ok(notebook)
        }
    }

    struct TimingOutEngine;

    impl ExecutionEngine for TimingOutEngine {
        fn name(&self) -> &str {
            "slow"
        }

        fn execute(
            &self,
            _notebook: Notebook,
            ctx: &ExecutionContext,
        ) -> std::result::Result<Notebook, ExecutionError> {
            Err(ExecutionError::Timeout {
                seconds: ctx.timeout.as_secs(),
            })
        }
    }

    fn notebook() -> Notebook {
        Notebook::new(vec![Cell::code("1", TagSet::new())])
    }

    #[test]
    fn test_cell_count_mismatch_is_error() {
        let stage = ExecuteStage::new(Arc::new(DroppingEngine), ExecutionContext::new("."));
        assert!(matches!(
            stage.run(notebook()),
            Err(SqlnbError::Execution(ExecutionError::Other(_)))
        ));
    }

    #[test]
    fn test_timeout_propagates() {
        let stage = ExecuteStage::new(Arc::new(TimingOutEngine), ExecutionContext::new("."));
        let err = stage.run(notebook()).unwrap_err();
        assert_eq!(err.to_string(), "Execution timed out after 600s");
    }
}
