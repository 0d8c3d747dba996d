/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Document rendering from projected cells.
 */

//! Document rendering from projected cells.
//!
//! The template context holds the notebook's front-matter fields and the
//! projected `cells`. Front-matter comes from the `front-matter` metadata
//! map, falling back to top-level metadata keys. A field that is set in
//! neither place is [`TemplateValue::Undefined`], so templates can tell
//! "not given" from an explicit `null` or an empty string.

use std::path::Path;

use serde_json::{Map, Value};
use sqlnb_template::{Template, TemplateContext, TemplateValue};

use crate::Result;
use crate::emit::ProjectedCell;
use crate::notebook::Notebook;

/// Metadata key holding the front-matter map.
pub const FRONT_MATTER_KEY: &str = "front-matter";

pub const FRONT_MATTER_FIELDS: [&str; 9] = [
    "title",
    "name",
    "author",
    "date",
    "categories",
    "exercise_type",
    "status",
    "tags",
    "description",
];

/// Front-matter values, one per field in [`FRONT_MATTER_FIELDS`].
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    values: Vec<(&'static str, TemplateValue)>,
}

impl FrontMatter {
    /// Read front-matter from notebook metadata.
    ///
    /// `name` defaults to the stem of `source` when unset.
    pub fn from_notebook(notebook: &Notebook, source: Option<&Path>) -> Self {
        let nested = notebook
            .metadata
            .get(FRONT_MATTER_KEY)
            .and_then(Value::as_object);

        let values = FRONT_MATTER_FIELDS
            .iter()
            .map(|&field| {
                let value = lookup(nested, &notebook.metadata, field)
                    .map(TemplateValue::from)
                    .unwrap_or_default();
                (field, value)
            })
            .map(|(field, value)| {
                if field == "name" && value.is_undefined() {
                    let stem = source
                        .and_then(Path::file_stem)
                        .map(|s| TemplateValue::from(s.to_string_lossy().into_owned()))
                        .unwrap_or_default();
                    (field, stem)
                } else {
                    (field, value)
                }
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&TemplateValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    fn insert_into(&self, ctx: &mut TemplateContext) {
        for (field, value) in &self.values {
            ctx.insert(*field, value.clone());
        }
    }
}

fn lookup<'a>(
    nested: Option<&'a Map<String, Value>>,
    top: &'a Map<String, Value>,
    field: &str,
) -> Option<&'a Value> {
    nested.and_then(|m| m.get(field)).or_else(|| top.get(field))
}

/// Template context for one document.
pub fn build_context(front_matter: &FrontMatter, cells: &[ProjectedCell]) -> TemplateContext {
    let mut ctx = TemplateContext::new();
    front_matter.insert_into(&mut ctx);
    ctx.insert(
        "cells",
        TemplateValue::List(cells.iter().map(ProjectedCell::to_template_value).collect()),
    );
    ctx
}

pub fn render_document(
    template: &Template,
    front_matter: &FrontMatter,
    cells: &[ProjectedCell],
) -> Result<String> {
    let ctx = build_context(front_matter, cells);
    Ok(template.render(&ctx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::SolutionLabel;
    use crate::tags::TagSet;
    use serde_json::json;

    fn notebook(metadata: Value) -> Notebook {
        let mut nb = Notebook::default();
        if let Value::Object(map) = metadata {
            nb.metadata = map;
        }
        nb
    }

    #[test]
    fn test_nested_front_matter_wins() {
        let nb = notebook(json!({
            "title": "top",
            "front-matter": {"title": "Joins", "author": null, "categories": ["sql", "joins"]}
        }));
        let fm = FrontMatter::from_notebook(&nb, Some(Path::new("course/ex1.ipynb")));
        assert_eq!(fm.get("title"), Some(&TemplateValue::from("Joins")));
        assert_eq!(fm.get("author"), Some(&TemplateValue::Null));
        assert_eq!(fm.get("name"), Some(&TemplateValue::from("ex1")));
        assert!(fm.get("date").unwrap().is_undefined());
        assert!(matches!(fm.get("categories"), Some(TemplateValue::List(items)) if items.len() == 2));
    }

    #[test]
    fn test_top_level_fallback_and_explicit_name() {
        let nb = notebook(json!({"title": "Aggregates", "name": "agg", "status": ""}));
        let fm = FrontMatter::from_notebook(&nb, Some(Path::new("ex2.ipynb")));
        assert_eq!(fm.get("title"), Some(&TemplateValue::from("Aggregates")));
        assert_eq!(fm.get("name"), Some(&TemplateValue::from("agg")));
        assert_eq!(fm.get("status"), Some(&TemplateValue::from("")));
        assert!(fm.get("description").unwrap().is_undefined());
    }

    #[test]
    fn test_render_document() {
        let template = Template::compile(
            "$if(title)$# $title$\n$endif$$for(cells)$$if(cells.solution_start)$>>$endif$$cells.source$;$endfor$",
        )
        .unwrap();
        let fm = FrontMatter::from_notebook(&notebook(json!({"title": "T"})), None);
        let cells = vec![
            ProjectedCell {
                cell_type: "markdown",
                source: "a".to_string(),
                tags: TagSet::new(),
                solution: SolutionLabel::None,
            },
            ProjectedCell {
                cell_type: "markdown",
                source: "b".to_string(),
                tags: ["correction"].into_iter().collect(),
                solution: SolutionLabel::StartEnd,
            },
        ];
        assert_eq!(render_document(&template, &fm, &cells).unwrap(), "# T\na;>>b;");
    }
}
