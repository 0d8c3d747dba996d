/*
 * stages/sql_compile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Rewrites `sql` cells into executable code cells.
 */

//! SQL compilation.
//!
//! For every `sql` cell:
//!
//! 1. unless `hideinput`, a fenced copy of the query is inserted before it
//!    (tagged `sql_source`, without `enum:end`);
//! 2. an `ignore` cell is dropped (any cell, not only SQL ones);
//! 3. the cell is split on `;` when it holds several statements (never for
//!    `plsql`);
//! 4. each resulting cell's source is replaced by generated code and its
//!    tags move from `sql_execute` to `sql_executed`.
//!
//! Cells produced by an earlier compilation (`sql_source`, `sql_executed`,
//! `sql_result`) pass through unchanged, so compiling twice is harmless.
//!
//! Nothing is executed here.

use serde_json::Value;

use crate::Result;
use crate::codegen::{CodeGenerator, QueryPlan};
use crate::config::SessionSettings;
use crate::error::CellLocation;
use crate::notebook::{Cell, Notebook, fresh_cell_id};
use crate::stage::NotebookStage;
use crate::tags::{self, SqlCellState, TagSet};

/// Compile with the default session settings.
pub fn compile(notebook: Notebook, connection_uri: &str) -> Result<Notebook> {
    compile_with(
        notebook,
        &CodeGenerator::new(connection_uri, SessionSettings::default()),
    )
}

pub fn compile_with(mut notebook: Notebook, generator: &CodeGenerator) -> Result<Notebook> {
    let cells = std::mem::take(&mut notebook.cells);
    let mut out = Vec::with_capacity(cells.len());

    for (index, cell) in cells.into_iter().enumerate() {
        let location = || CellLocation::new(index, cell.tags().iter());
        let state = SqlCellState::of(cell.tags(), location)?;

        // Fences, results and already compiled cells keep the `sql` tag of
        // the query they came from; they are never compiled again.
        if state != SqlCellState::Untouched || cell.has_tag(tags::SQL_SOURCE) {
            tracing::debug!(cell = index, "Keeping derived SQL cell");
            out.push(cell);
            continue;
        }

        let is_sql = cell.has_tag(tags::SQL);

        if is_sql && !cell.has_tag(tags::HIDE_INPUT) {
            out.push(source_fence(&cell));
        }

        if cell.has_tag(tags::IGNORE) {
            tracing::debug!(cell = index, "Dropping ignored cell");
            continue;
        }

        if !is_sql {
            out.push(cell);
            continue;
        }

        let pending = cell.tags().with(tags::SQL_EXECUTE);
        let statements = split_statements(&cell.source, cell.has_tag(tags::PLSQL));
        if statements.len() > 1 {
            tracing::debug!(cell = index, statements = statements.len(), "Splitting SQL cell");
        }

        for (n, statement) in statements.iter().enumerate() {
            let plan = QueryPlan::from_cell(statement, &pending, || {
                CellLocation::new(index, cell.tags().iter())
            })?;
            let compiled = cell
                .clone()
                .into_code(generator.generate(&plan))
                .with_tags(pending.retag(tags::SQL_EXECUTE, tags::SQL_EXECUTED));
            out.push(if n == 0 { compiled } else { compiled.with_fresh_id() });
        }
    }

    Ok(notebook.with_cells(out))
}

/// The narrative copy of a query shown to readers.
fn source_fence(cell: &Cell) -> Cell {
    let tags: TagSet = cell.tags().without(tags::ENUM_END).with(tags::SQL_SOURCE);
    let mut fence = Cell::markdown(format!("```sql\n{}\n```", cell.source), tags);
    if cell.extra.contains_key("id") {
        fence
            .extra
            .insert("id".to_string(), Value::String(fresh_cell_id()));
    }
    fence
}

/// Split a SQL cell into its statements.
///
/// A cell is only split when, once its trailing `;` is removed, another `;`
/// remains. Empty statements are discarded.
pub fn split_statements(source: &str, plsql: bool) -> Vec<String> {
    if plsql {
        return vec![source.to_string()];
    }
    let body = source.trim_end().trim_end_matches(';');
    if !body.contains(';') {
        return vec![source.to_string()];
    }
    body.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pipeline stage wrapping [`compile_with`].
pub struct SqlCompileStage {
    generator: CodeGenerator,
}

impl SqlCompileStage {
    pub fn new(generator: CodeGenerator) -> Self {
        Self { generator }
    }
}

impl NotebookStage for SqlCompileStage {
    fn name(&self) -> &str {
        "sql-compile"
    }

    fn run(&self, notebook: Notebook) -> Result<Notebook> {
        compile_with(notebook, &self.generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlnbError;

    fn tags(list: &[&str]) -> TagSet {
        list.iter().copied().collect()
    }

    fn sql_cell(source: &str, extra: &[&str]) -> Cell {
        let mut list = vec!["sql"];
        list.extend_from_slice(extra);
        Cell::code(source, tags(&list))
    }

    fn compile_cells(cells: Vec<Cell>) -> Result<Vec<Cell>> {
        Ok(compile(Notebook::new(cells), "oracle://u:p@db/XE")?.cells)
    }

    #[test]
    fn test_fence_inserted_before_query() {
        let cells = compile_cells(vec![sql_cell("SELECT 1;", &["enum:end"])]).unwrap();
        assert_eq!(cells.len(), 2);
        assert!(cells[0].is_markdown());
        assert_eq!(cells[0].source, "```sql\nSELECT 1;\n```");
        assert_eq!(cells[0].tags().to_vec(), vec!["sql", "sql_source"]);

        assert!(cells[1].is_code());
        assert_eq!(
            cells[1].tags().to_vec(),
            vec!["sql", "enum:end", "sql_executed"]
        );
        assert!(cells[1].source.contains("pd.read_sql(sql=\"\"\"SELECT 1\"\"\""));
    }

    #[test]
    fn test_hideinput_has_no_fence() {
        let cells = compile_cells(vec![sql_cell("SELECT 1", &["hideinput"])]).unwrap();
        assert_eq!(cells.len(), 1);
        assert!(cells[0].has_tag("sql_executed"));
    }

    #[test]
    fn test_ignore_keeps_only_fence() {
        let cells = compile_cells(vec![sql_cell("SELECT 1", &["ignore"])]).unwrap();
        assert_eq!(cells.len(), 1);
        assert!(cells[0].has_tag("sql_source"));

        let hidden = compile_cells(vec![sql_cell("SELECT 1", &["ignore", "hideinput"])]).unwrap();
        assert!(hidden.is_empty());

        let narrative = compile_cells(vec![Cell::markdown("draft", tags(&["ignore"]))]).unwrap();
        assert!(narrative.is_empty());
    }

    #[test]
    fn test_three_statements_split_in_order() {
        let source = "CREATE TABLE t (a INT);\nINSERT INTO t VALUES (1);\nSELECT * FROM t;";
        let cells = compile_cells(vec![sql_cell(source, &["noresult"])]).unwrap();
        assert_eq!(cells.len(), 4);
        assert!(cells[0].has_tag("sql_source"));
        assert!(cells[1].source.contains("CREATE TABLE t (a INT)"));
        assert!(cells[2].source.contains("INSERT INTO t VALUES (1)"));
        assert!(cells[3].source.contains("SELECT * FROM t\"\"\""));
        for cell in &cells[1..] {
            assert_eq!(cell.tags().to_vec(), vec!["sql", "noresult", "sql_executed"]);
        }
    }

    #[test]
    fn test_plsql_is_not_split() {
        let source = "BEGIN\n  INSERT INTO t VALUES (1);\n  COMMIT;\nEND;\n/";
        let cells = compile_cells(vec![sql_cell(source, &["plsql", "noresult", "hideinput"])]).unwrap();
        assert_eq!(cells.len(), 1);
        assert!(cells[0].source.contains("COMMIT;\nEND;\"\"\""));
    }

    #[test]
    fn test_split_statements() {
        assert_eq!(split_statements("SELECT 1;", false), vec!["SELECT 1;"]);
        assert_eq!(split_statements("SELECT 1; ;SELECT 2;", false), vec!["SELECT 1", "SELECT 2"]);
        assert_eq!(split_statements("a;b", true), vec!["a;b"]);
    }

    #[test]
    fn test_split_cells_get_distinct_ids() {
        let mut cell = sql_cell("SELECT 1; SELECT 2;", &["hideinput"]);
        cell.extra.insert("id".to_string(), serde_json::json!("orig0001"));
        let cells = compile_cells(vec![cell]).unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].extra["id"], "orig0001");
        assert_ne!(cells[1].extra["id"], "orig0001");
    }

    #[test]
    fn test_non_sql_cells_untouched() {
        let intro = Cell::markdown("# Intro", TagSet::new());
        let python = Cell::code("print(1)", tags(&["correction"]));
        let cells = compile_cells(vec![intro.clone(), python.clone()]).unwrap();
        assert_eq!(cells, vec![intro, python]);
    }

    #[test]
    fn test_bad_tags_report_cell() {
        let cells = vec![
            Cell::markdown("# Intro", TagSet::new()),
            sql_cell("SELECT 1", &["dateformat:MON-YY"]),
        ];
        let err = compile_cells(cells).unwrap_err();
        match err {
            SqlnbError::Configuration { location, .. } => {
                assert_eq!(location.index, Some(1));
                assert!(location.tags.contains(&"dateformat:MON-YY".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = compile_cells(vec![sql_cell("SELECT 1", &["limit:x"])]).unwrap_err();
        assert!(matches!(err, SqlnbError::Configuration { .. }));
    }

    #[test]
    fn test_derived_cells_are_not_recompiled() {
        let fence = Cell::markdown("```sql\nSELECT 1;\n```", tags(&["sql", "ignore", "sql_source"]));
        let result = Cell::markdown("<table></table>", tags(&["sql", "sql_result"]));
        let cells = compile_cells(vec![fence.clone(), result.clone()]).unwrap();
        assert_eq!(cells, vec![fence, result]);
    }

    #[test]
    fn test_compiling_twice_changes_nothing() {
        let once = compile_cells(vec![
            sql_cell("SELECT 1; SELECT 2;", &[]),
            sql_cell("SELECT 3", &["ignore"]),
        ])
        .unwrap();
        assert_eq!(once.len(), 4);
        let twice = compile_cells(once.clone()).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_conflicting_lifecycle_tags_rejected() {
        let cell = sql_cell("SELECT 1", &["sql_execute", "sql_result"]);
        assert!(matches!(
            compile_cells(vec![cell]),
            Err(SqlnbError::InvariantViolation { .. })
        ));
    }
}
