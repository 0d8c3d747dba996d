/*
 * solution.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Solution-run labelling.
 */

//! Solution-run labelling.
//!
//! A solution run is a maximal sequence of consecutive `correction` cells.
//! Emitters need to know where each run opens and closes (to wrap it in a
//! frame or a `<details>` block), so every cell gets a [`SolutionLabel`]:
//!
//! | state    | cell        | action                                          |
//! |----------|-------------|-------------------------------------------------|
//! | `NONE`   | correction  | emit `StartEnd`, enter `IN_RUN`                 |
//! | `IN_RUN` | correction  | previous `StartEnd` becomes `Start`; emit `Solution` |
//! | `IN_RUN` | other       | previous `Solution` becomes `End`; emit `None`, leave run |
//! | `NONE`   | other       | emit `None`                                     |
//!
//! A run still open at the end of the notebook is closed the same way.
//! Labels are only handed to emitters; they are never written back to tags.

use crate::Result;
use crate::error::{CellLocation, SqlnbError};
use crate::notebook::Cell;
use crate::tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionLabel {
    None,
    Start,
    Solution,
    End,
    /// A run of a single cell.
    StartEnd,
}

impl SolutionLabel {
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            SolutionLabel::None => None,
            SolutionLabel::Start => Some("solution_start"),
            SolutionLabel::Solution => Some("solution"),
            SolutionLabel::End => Some("solution_end"),
            SolutionLabel::StartEnd => Some("solution_start_end"),
        }
    }

    pub fn in_run(self) -> bool {
        self != SolutionLabel::None
    }

    pub fn opens_run(self) -> bool {
        matches!(self, SolutionLabel::Start | SolutionLabel::StartEnd)
    }

    pub fn closes_run(self) -> bool {
        matches!(self, SolutionLabel::End | SolutionLabel::StartEnd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    None,
    InRun,
}

/// Label every cell with its position in a solution run.
pub fn index_solution_runs(cells: &[Cell]) -> Vec<SolutionLabel> {
    let (mut labels, state) = cells.iter().fold(
        (Vec::with_capacity(cells.len()), RunState::None),
        |(mut labels, state), cell| {
            let correction = cell.has_tag(tags::CORRECTION);
            let next = match (state, correction) {
                (RunState::None, true) => {
                    labels.push(SolutionLabel::StartEnd);
                    RunState::InRun
                }
                (RunState::InRun, true) => {
                    if let Some(last @ SolutionLabel::StartEnd) = labels.last_mut() {
                        *last = SolutionLabel::Start;
                    }
                    labels.push(SolutionLabel::Solution);
                    RunState::InRun
                }
                (RunState::InRun, false) => {
                    close_run(&mut labels);
                    labels.push(SolutionLabel::None);
                    RunState::None
                }
                (RunState::None, false) => {
                    labels.push(SolutionLabel::None);
                    RunState::None
                }
            };
            (labels, next)
        },
    );

    if state == RunState::InRun {
        close_run(&mut labels);
    }
    labels
}

fn close_run(labels: &mut [SolutionLabel]) {
    if let Some(last @ SolutionLabel::Solution) = labels.last_mut() {
        *last = SolutionLabel::End;
    }
}

/// Check that labels form a valid bracketing.
///
/// Every run opens with `Start` (or is a lone `StartEnd`), contains only
/// `Solution` cells, and closes with `End` before any unlabelled cell.
pub fn validate_bracketing(cells: &[Cell], labels: &[SolutionLabel]) -> Result<()> {
    let violation = |index: usize, message: &str| {
        let tags = cells.get(index).map(|c| c.tags().to_vec()).unwrap_or_default();
        SqlnbError::invariant(CellLocation::new(index, tags), message)
    };

    if cells.len() != labels.len() {
        return Err(violation(
            labels.len().min(cells.len()),
            "solution labels do not cover every cell",
        ));
    }

    let mut open = false;
    for (index, label) in labels.iter().enumerate() {
        open = match (open, label) {
            (false, SolutionLabel::None) => false,
            (false, SolutionLabel::Start) => true,
            (false, SolutionLabel::StartEnd) => false,
            (true, SolutionLabel::Solution) => true,
            (true, SolutionLabel::End) => false,
            (false, _) => return Err(violation(index, "solution run continues without a start")),
            (true, _) => return Err(violation(index, "solution run is not closed")),
        };
    }
    if open {
        return Err(violation(
            labels.len().saturating_sub(1),
            "solution run is not closed at end of notebook",
        ));
    }
    Ok(())
}
