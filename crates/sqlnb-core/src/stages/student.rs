/*
 * stages/student.rs
 * Copyright (c) 2025 Posit, PBC
 */

use crate::Result;
use crate::notebook::Notebook;
use crate::stage::NotebookStage;
use crate::tags;

/// Drop every `correction` cell, keeping the others in order.
pub fn filter_student(mut notebook: Notebook) -> Notebook {
    let before = notebook.cells.len();
    notebook.cells.retain(|cell| !cell.has_tag(tags::CORRECTION));
    tracing::debug!(removed = before - notebook.cells.len(), "Removed solution cells");
    notebook
}

pub struct StudentFilterStage;

impl NotebookStage for StudentFilterStage {
    fn name(&self) -> &str {
        "student-filter"
    }

    fn run(&self, notebook: Notebook) -> Result<Notebook> {
        Ok(filter_student(notebook))
    }
}
