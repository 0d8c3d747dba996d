/*
 * stages/reclassify.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Turns executed SQL cells back into narrative cells.
 */

//! Output reclassification.
//!
//! Runs after execution. Each `sql_executed` cell is replaced by what the
//! reader should see:
//!
//! - a plain query becomes a markdown cell holding the HTML table
//!   (`sql_result`);
//! - an `except` query that printed something becomes a console block
//!   (`sql_source`, without `oracle`);
//! - a `noresult` query, or one without output, is dropped.

use crate::Result;
use crate::error::{CellLocation, SqlnbError};
use crate::notebook::{Cell, CellOutput, Notebook};
use crate::stage::NotebookStage;
use crate::tags::{self, SqlCellState};

pub fn reclassify(mut notebook: Notebook) -> Result<Notebook> {
    let cells = std::mem::take(&mut notebook.cells);
    let mut out = Vec::with_capacity(cells.len());

    for (index, cell) in cells.into_iter().enumerate() {
        let location = || CellLocation::new(index, cell.tags().iter());
        if SqlCellState::of(cell.tags(), location)? != SqlCellState::Executed {
            out.push(cell);
            continue;
        }
        if let Some(cell) = reclassify_cell(index, cell)? {
            out.push(cell);
        }
    }

    Ok(notebook.with_cells(out))
}

fn reclassify_cell(index: usize, cell: Cell) -> Result<Option<Cell>> {
    if cell.has_tag(tags::NO_RESULT) {
        tracing::debug!(cell = index, "Dropping noresult cell");
        return Ok(None);
    }
    if cell.outputs().is_empty() {
        tracing::warn!(cell = index, "Executed SQL cell has no output, dropping it");
        return Ok(None);
    }

    if cell.has_tag(tags::EXCEPT) {
        let Some(text) = console_text(cell.outputs()) else {
            tracing::warn!(cell = index, "Captured query printed nothing, dropping it");
            return Ok(None);
        };
        let mut body = format!("```console\n{text}");
        if !body.ends_with('\n') {
            body.push('\n');
        }
        body.push_str("```");
        let tags = cell
            .tags()
            .without(tags::SQL_EXECUTED)
            .with(tags::SQL_SOURCE)
            .without(tags::ORACLE);
        return Ok(Some(cell.into_markdown(body).with_tags(tags)));
    }

    let text = result_text(cell.outputs()).ok_or_else(|| {
        SqlnbError::invariant(
            CellLocation::new(index, cell.tags().iter()),
            "executed SQL cell has no textual result",
        )
    })?;
    let tags = cell.tags().retag(tags::SQL_EXECUTED, tags::SQL_RESULT);
    Ok(Some(cell.into_markdown(unescape_repr(&text)).with_tags(tags)))
}

/// The rendered table: the first rich result with a `text/plain` entry.
///
/// Falls back to the first output's text, so warnings printed ahead of the
/// result do not hide it.
fn result_text(outputs: &[CellOutput]) -> Option<String> {
    outputs
        .iter()
        .filter(|o| matches!(o, CellOutput::ExecuteResult { .. }))
        .find_map(CellOutput::text_payload)
        .or_else(|| outputs.first().and_then(CellOutput::text_payload))
}

/// What a captured query printed: stdout first, any textual output otherwise.
fn console_text(outputs: &[CellOutput]) -> Option<String> {
    outputs
        .iter()
        .find_map(|o| match o {
            CellOutput::Stream { name, text } if name == "stdout" => Some(text.clone()),
            _ => None,
        })
        .or_else(|| outputs.iter().find_map(CellOutput::text_payload))
}

/// Reverse the string repr the kernel puts in `text/plain`.
///
/// Surrounding quotes are removed and `\n`, `\t`, `\'`, `\"` and `\\` are
/// turned back into the characters they stand for.
pub fn unescape_repr(repr: &str) -> String {
    let inner = ['\'', '"']
        .into_iter()
        .find_map(|q| {
            repr.strip_prefix(q)
                .and_then(|r| r.strip_suffix(q))
        })
        .unwrap_or(repr);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(q @ ('\'' | '"' | '\\')) => out.push(q),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub struct ReclassifyStage;

impl NotebookStage for ReclassifyStage {
    fn name(&self) -> &str {
        "reclassify"
    }

    fn run(&self, notebook: Notebook) -> Result<Notebook> {
        reclassify(notebook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::CellKind;
    use crate::tags::TagSet;

    fn executed(list: &[&str], outputs: Vec<CellOutput>) -> Cell {
        let mut tags = vec!["sql"];
        tags.extend_from_slice(list);
        tags.push("sql_executed");
        let mut cell = Cell::code("generated", tags.into_iter().collect::<TagSet>());
        cell.kind = CellKind::Code { outputs };
        cell
    }

    fn run(cells: Vec<Cell>) -> Vec<Cell> {
        reclassify(Notebook::new(cells)).unwrap().cells
    }

    #[test]
    fn test_result_becomes_markdown_table() {
        let cells = run(vec![executed(
            &["limit:5"],
            vec![CellOutput::text_result(
                r#"'<table class="dataframe">\n  <td>O\'Neil</td>\n</table>'"#,
            )],
        )]);
        assert_eq!(cells.len(), 1);
        assert!(cells[0].is_markdown());
        assert_eq!(
            cells[0].source,
            "<table class=\"dataframe\">\n  <td>O'Neil</td>\n</table>"
        );
        assert_eq!(cells[0].tags().to_vec(), vec!["sql", "limit:5", "sql_result"]);
        assert!(!cells[0].extra.contains_key("execution_count"));
    }

    #[test]
    fn test_warning_before_result_is_skipped() {
        let cells = run(vec![executed(
            &[],
            vec![
                CellOutput::Stream {
                    name: "stderr".to_string(),
                    text: "UserWarning: pandas only supports SQLAlchemy".to_string(),
                },
                CellOutput::text_result("'<table></table>'"),
            ],
        )]);
        assert_eq!(cells[0].source, "<table></table>");
    }

    #[test]
    fn test_except_becomes_console_block() {
        let cells = run(vec![executed(
            &["except", "oracle"],
            vec![CellOutput::stdout("ORA-00942: table or view does not exist")],
        )]);
        assert_eq!(cells.len(), 1);
        assert_eq!(
            cells[0].source,
            "```console\nORA-00942: table or view does not exist\n```"
        );
        assert_eq!(cells[0].tags().to_vec(), vec!["sql", "except", "sql_source"]);
    }

    #[test]
    fn test_noresult_and_empty_dropped() {
        let cells = run(vec![
            executed(&["noresult"], vec![CellOutput::stdout("ignored")]),
            executed(&[], vec![]),
            executed(&["except"], vec![]),
        ]);
        assert!(cells.is_empty());
    }

    #[test]
    fn test_other_cells_pass_through() {
        let intro = Cell::markdown("# Intro", TagSet::new());
        let fence = Cell::markdown("```sql\nSELECT 1\n```", ["sql", "sql_source"].into_iter().collect());
        let cells = run(vec![intro.clone(), fence.clone()]);
        assert_eq!(cells, vec![intro, fence]);
    }

    #[test]
    fn test_no_lifecycle_tags_remain() {
        let cells = run(vec![
            executed(&[], vec![CellOutput::text_result("'<table></table>'")]),
            executed(&["except"], vec![CellOutput::stdout("boom\n")]),
        ]);
        for cell in &cells {
            assert!(!cell.has_tag("sql_execute"));
            assert!(!cell.has_tag("sql_executed"));
            assert!(cell.has_tag("sql_result") ^ cell.has_tag("sql_source"));
        }
        assert_eq!(cells[1].source, "```console\nboom\n```");
    }

    #[test]
    fn test_unescape_repr() {
        assert_eq!(unescape_repr(r"'a\nb'"), "a\nb");
        assert_eq!(unescape_repr(r#""it's""#), "it's");
        assert_eq!(unescape_repr(r"'back\\slash \d'"), r"back\slash \d");
        assert_eq!(unescape_repr("unquoted"), "unquoted");
    }
}
