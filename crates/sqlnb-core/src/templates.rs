/*
 * templates.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in document templates.
 */

//! Built-in document templates.
//!
//! The default LaTeX and Markdown templates and the HTML page used to
//! screenshot query results are embedded at compile time. `convert -t`
//! replaces the document template with one read from disk.

use std::path::Path;

use include_dir::{Dir, include_dir};
use sqlnb_template::{Template, TemplateError};

use crate::Result;
use crate::error::SqlnbError;

static TEMPLATES_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/resources/templates");

pub const LATEX_TEMPLATE: &str = "latex.tex";
pub const MARKDOWN_TEMPLATE: &str = "markdown.md";
pub const TABLE_IMAGE_TEMPLATE: &str = "table_image.html";

/// Source text of an embedded template.
pub fn builtin_template(name: &str) -> Option<&'static str> {
    TEMPLATES_DIR
        .get_file(name)
        .and_then(|file| file.contents_utf8())
}

/// Compile the template at `path`, or the embedded `builtin` when no path is given.
pub fn load_template(path: Option<&Path>, builtin: &str) -> Result<Template> {
    match path {
        Some(path) => Template::from_file(path).map_err(|e| match e {
            TemplateError::Io(io) => {
                SqlnbError::resource(path, format!("cannot read template: {io}"))
            }
            other => SqlnbError::resource(path, other.to_string()),
        }),
        None => {
            let source = builtin_template(builtin).ok_or_else(|| {
                SqlnbError::resource(builtin, "no such built-in template")
            })?;
            Ok(Template::compile(source)?)
        }
    }
}
