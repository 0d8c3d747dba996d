/*
 * emit/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Format emitters.
 */

//! Format emitters.
//!
//! An emitter projects a reclassified notebook onto a flat list of
//! [`ProjectedCell`]s whose sources are already in the target markup. The
//! list, together with the front-matter, becomes the context of a document
//! template (see [`crate::render`]).
//!
//! | cell                    | `latex`              | `markdown`        | `md+html`   |
//! |-------------------------|----------------------|-------------------|-------------|
//! | markdown + `sql_source` | converted, emphasis  | unchanged         | unchanged   |
//! | markdown + `sql_result` | figure `k`           | image link `k`    | unchanged   |
//! | anything else           | converted + cleanup  | converted         | converted   |
//!
//! `k` counts `sql_result` cells from 1 in document order, the same
//! numbering [`crate::images::extract_images`] uses to name the files.

pub mod latex;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use sqlnb_template::TemplateValue;

use crate::Result;
use crate::convert::MarkupConverter;
use crate::error::SqlnbError;
use crate::notebook::{Cell, Notebook};
use crate::solution::{SolutionLabel, index_solution_runs, validate_bracketing};
use crate::tags::{self, TagSet};
use crate::templates;

/// Output flavour of `convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    Latex,
    Markdown,
    /// Markdown with query results kept as HTML tables.
    MarkdownHtml,
}

impl EmitMode {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "latex" => Ok(Self::Latex),
            "markdown" => Ok(Self::Markdown),
            "md+html" => Ok(Self::MarkdownHtml),
            other => Err(SqlnbError::config(format!(
                "unknown conversion mode '{other}' (expected latex, markdown or md+html)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latex => "latex",
            Self::Markdown => "markdown",
            Self::MarkdownHtml => "md+html",
        }
    }

    /// Target format handed to the markup converter.
    pub fn target_format(self) -> &'static str {
        match self {
            Self::Latex => "latex",
            Self::Markdown | Self::MarkdownHtml => "markdown",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Latex => "tex",
            Self::Markdown | Self::MarkdownHtml => "md",
        }
    }

    /// Embedded template used when no `-t` is given.
    pub fn template_name(self) -> &'static str {
        match self {
            Self::Latex => templates::LATEX_TEMPLATE,
            Self::Markdown | Self::MarkdownHtml => templates::MARKDOWN_TEMPLATE,
        }
    }
}

impl fmt::Display for EmitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cell as the document template sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCell {
    pub cell_type: &'static str,
    pub source: String,
    pub tags: TagSet,
    pub solution: SolutionLabel,
}

impl ProjectedCell {
    pub fn to_template_value(&self) -> TemplateValue {
        let mut map = HashMap::new();
        map.insert("source".to_string(), TemplateValue::from(self.source.as_str()));
        map.insert("cell_type".to_string(), TemplateValue::from(self.cell_type));
        map.insert(
            "type".to_string(),
            self.solution
                .as_str()
                .map(TemplateValue::from)
                .unwrap_or_default(),
        );
        map.insert(
            "tags".to_string(),
            TemplateValue::List(self.tags.iter().map(TemplateValue::from).collect()),
        );
        map.insert("solution".to_string(), self.solution.in_run().into());
        map.insert("solution_start".to_string(), self.solution.opens_run().into());
        map.insert("solution_end".to_string(), self.solution.closes_run().into());
        TemplateValue::Map(map)
    }
}

pub fn is_sql_result(cell: &Cell) -> bool {
    emit_kind(cell) == EmitKind::Result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitKind {
    Source,
    Result,
    Narrative,
}

/// The one classification shared by the emitters and image extraction, so
/// result numbering agrees between them. `sql_source` wins over `sql_result`.
fn emit_kind(cell: &Cell) -> EmitKind {
    if !cell.is_markdown() {
        EmitKind::Narrative
    } else if cell.has_tag(tags::SQL_SOURCE) {
        EmitKind::Source
    } else if cell.has_tag(tags::SQL_RESULT) {
        EmitKind::Result
    } else {
        EmitKind::Narrative
    }
}

/// Result cells paired with their 1-based image number.
pub fn sql_result_cells(notebook: &Notebook) -> impl Iterator<Item = (usize, &Cell)> {
    notebook
        .cells
        .iter()
        .filter(|c| is_sql_result(c))
        .enumerate()
        .map(|(i, c)| (i + 1, c))
}

pub fn result_image_name(basename: &str, k: usize) -> String {
    format!("{basename}_{k}")
}

/// `<output>/images/<basename>_<k>.png`
pub fn result_image_path(output: &Path, basename: &str, k: usize) -> PathBuf {
    output
        .join("images")
        .join(format!("{}.png", result_image_name(basename, k)))
}

/// What a cell is, from an emitter's point of view.
enum Role {
    Source,
    /// A query result and its image number.
    Result(usize),
    Narrative,
}

/// Label solution runs, then let `project` produce each cell's new source.
fn project_cells(
    notebook: &Notebook,
    mut project: impl FnMut(&Cell, Role) -> Result<String>,
) -> Result<Vec<ProjectedCell>> {
    let labels = index_solution_runs(&notebook.cells);
    validate_bracketing(&notebook.cells, &labels)?;

    let mut k = 0;
    notebook
        .cells
        .iter()
        .zip(labels)
        .map(|(cell, solution)| {
            let role = match emit_kind(cell) {
                EmitKind::Source => Role::Source,
                EmitKind::Result => {
                    k += 1;
                    Role::Result(k)
                }
                EmitKind::Narrative => Role::Narrative,
            };
            Ok(ProjectedCell {
                cell_type: cell.cell_type(),
                source: project(cell, role)?,
                tags: cell.tags().clone(),
                solution,
            })
        })
        .collect()
}

pub fn emit_latex(
    notebook: &Notebook,
    output: &Path,
    image_basename: &str,
    converter: &dyn MarkupConverter,
) -> Result<Vec<ProjectedCell>> {
    project_cells(notebook, |cell, role| match role {
        Role::Source => Ok(latex::source_block(&converter.convert(&cell.source, "latex")?)),
        Role::Result(k) => Ok(latex::result_figure(&result_image_path(
            output,
            image_basename,
            k,
        ))),
        Role::Narrative => Ok(latex::post_process(
            &converter.convert(&cell.source, "latex")?,
            cell.tags(),
        )),
    })
}

pub fn emit_markdown(
    notebook: &Notebook,
    output: &Path,
    image_basename: &str,
    converter: &dyn MarkupConverter,
) -> Result<Vec<ProjectedCell>> {
    project_cells(notebook, |cell, role| match role {
        Role::Source => Ok(cell.source.clone()),
        Role::Result(k) => Ok(format!(
            "![{image_basename}]({})",
            result_image_path(output, image_basename, k).display()
        )),
        Role::Narrative => converter.convert(&cell.source, "markdown"),
    })
}

pub fn emit_markdown_html(
    notebook: &Notebook,
    converter: &dyn MarkupConverter,
) -> Result<Vec<ProjectedCell>> {
    project_cells(notebook, |cell, role| match role {
        Role::Source | Role::Result(_) => Ok(cell.source.clone()),
        Role::Narrative => converter.convert(&cell.source, "markdown"),
    })
}

/// Run the emitter for `mode`.
pub fn emit(
    mode: EmitMode,
    notebook: &Notebook,
    output: &Path,
    image_basename: &str,
    converter: &dyn MarkupConverter,
) -> Result<Vec<ProjectedCell>> {
    tracing::debug!(mode = %mode, converter = converter.name(), "Emitting cells");
    match mode {
        EmitMode::Latex => emit_latex(notebook, output, image_basename, converter),
        EmitMode::Markdown => emit_markdown(notebook, output, image_basename, converter),
        EmitMode::MarkdownHtml => emit_markdown_html(notebook, converter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tags the text with the target format so tests can see what was converted.
    struct MarkingConverter;

    impl MarkupConverter for MarkingConverter {
        fn name(&self) -> &str {
            "marking"
        }

        fn convert(&self, source: &str, target: &str) -> Result<String> {
            Ok(format!("[{target}] {source}"))
        }
    }

    fn tagged(list: &[&str]) -> TagSet {
        list.iter().copied().collect()
    }

    fn sample() -> Notebook {
        Notebook::new(vec![
            Cell::markdown("# Intro", TagSet::new()),
            Cell::markdown("```sql\nSELECT 1\n```", tagged(&["sql", "sql_source"])),
            Cell::markdown("<table>1</table>", tagged(&["sql", "sql_result"])),
            Cell::markdown("Answer", tagged(&["correction"])),
            Cell::markdown("```sql\nSELECT 2\n```", tagged(&["sql_source", "correction"])),
            Cell::markdown("<table>2</table>", tagged(&["sql_result", "correction"])),
            Cell::raw("raw", TagSet::new()),
        ])
    }

    #[test]
    fn test_mode_names() {
        for mode in [EmitMode::Latex, EmitMode::Markdown, EmitMode::MarkdownHtml] {
            assert_eq!(EmitMode::parse(mode.as_str()).unwrap(), mode);
        }
        assert_eq!(EmitMode::MarkdownHtml.extension(), "md");
        assert!(matches!(
            EmitMode::parse("html"),
            Err(SqlnbError::Configuration { .. })
        ));
    }

    #[test]
    fn test_markdown_projection() {
        let cells = emit_markdown(&sample(), Path::new("out"), "ex1", &MarkingConverter).unwrap();
        let sources: Vec<&str> = cells.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(
            sources,
            vec![
                "[markdown] # Intro",
                "```sql\nSELECT 1\n```",
                "![ex1](out/images/ex1_1.png)",
                "[markdown] Answer",
                "```sql\nSELECT 2\n```",
                "![ex1](out/images/ex1_2.png)",
                "[markdown] raw",
            ]
        );
        let labels: Vec<SolutionLabel> = cells.iter().map(|c| c.solution).collect();
        assert_eq!(
            labels,
            vec![
                SolutionLabel::None,
                SolutionLabel::None,
                SolutionLabel::None,
                SolutionLabel::Start,
                SolutionLabel::Solution,
                SolutionLabel::End,
                SolutionLabel::None,
            ]
        );
    }

    #[test]
    fn test_markdown_html_keeps_tables() {
        let cells = emit_markdown_html(&sample(), &MarkingConverter).unwrap();
        assert_eq!(cells[2].source, "<table>1</table>");
        assert_eq!(cells[5].source, "<table>2</table>");
        assert_eq!(cells[0].source, "[markdown] # Intro");
    }

    #[test]
    fn test_latex_projection() {
        let cells = emit_latex(&sample(), Path::new("out"), "ex1", &MarkingConverter).unwrap();
        assert_eq!(cells[1].source, "[latex] ```sql\nSELECT 1\n```");
        assert!(cells[2].source.contains("{out/images/ex1_1.png}"));
        assert!(cells[5].source.contains("{out/images/ex1_2.png}"));
        assert_eq!(cells[6].cell_type, "raw");
    }

    #[test]
    fn test_result_numbering_matches_image_paths() {
        let nb = sample();
        let numbered: Vec<(usize, &str)> = sql_result_cells(&nb)
            .map(|(k, c)| (k, c.source.as_str()))
            .collect();
        assert_eq!(numbered, vec![(1, "<table>1</table>"), (2, "<table>2</table>")]);
        assert_eq!(
            result_image_path(Path::new("out"), "ex1", 2),
            PathBuf::from("out/images/ex1_2.png")
        );
    }

    #[test]
    fn test_source_and_result_tags_count_once() {
        let nb = Notebook::new(vec![
            Cell::markdown("```sql\nSELECT 0\n```", tagged(&["sql_source", "sql_result"])),
            Cell::markdown("<table>1</table>", tagged(&["sql_result"])),
        ]);
        let numbered: Vec<usize> = sql_result_cells(&nb).map(|(k, _)| k).collect();
        assert_eq!(numbered, vec![1]);

        let cells = emit_markdown(&nb, Path::new("out"), "ex1", &MarkingConverter).unwrap();
        assert_eq!(cells[0].source, "```sql\nSELECT 0\n```");
        assert_eq!(cells[1].source, "![ex1](out/images/ex1_1.png)");
    }

    #[test]
    fn test_code_cell_with_result_tag_is_narrative() {
        let nb = Notebook::new(vec![Cell::code("x = 1", tagged(&["sql_result"]))]);
        let cells = emit_markdown(&nb, Path::new("out"), "ex", &MarkingConverter).unwrap();
        assert_eq!(cells[0].source, "[markdown] x = 1");
        assert_eq!(sql_result_cells(&nb).count(), 0);
    }

    #[test]
    fn test_template_value_flags() {
        let cell = ProjectedCell {
            cell_type: "markdown",
            source: "s".to_string(),
            tags: tagged(&["correction"]),
            solution: SolutionLabel::StartEnd,
        };
        let value = cell.to_template_value();
        assert_eq!(value.get_path(&["type"]), Some(&TemplateValue::from("solution_start_end")));
        assert_eq!(value.get_path(&["solution_start"]), Some(&TemplateValue::Bool(true)));
        assert_eq!(value.get_path(&["solution_end"]), Some(&TemplateValue::Bool(true)));

        let plain = ProjectedCell {
            solution: SolutionLabel::None,
            ..cell
        };
        assert!(plain.to_template_value().get_path(&["type"]).unwrap().is_undefined());
    }
}
