/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Pandoc-style document templates for sqlnb.
//!
//! The converter renders its final LaTeX and Markdown files (and the HTML
//! page used to screenshot query results) through templates written in the
//! Pandoc [doctemplates](https://github.com/jgm/doctemplates) dialect:
//!
//! - Variable interpolation: `$variable$` or `${variable}`
//! - Nested field access: `$cells.source$`
//! - Literal separators for lists: `$tags[, ]$`
//! - Conditionals: `$if(var)$...$elseif(other)$...$else$...$endif$`
//! - For loops: `$for(items)$...$sep$...$endfor$`
//! - Comments: `$-- comment`
//! - Escaped dollar: `$$`
//!
//! Partials, pipes and nesting directives are not supported.
//!
//! # Example
//!
//! ```ignore
//! use sqlnb_template::{Template, TemplateContext, TemplateValue};
//!
//! let template = Template::compile("Hello, $name$!")?;
//!
//! let mut ctx = TemplateContext::new();
//! ctx.insert("name", TemplateValue::String("World".to_string()));
//!
//! assert_eq!(template.render(&ctx)?, "Hello, World!");
//! ```

pub mod ast;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod parser;

pub use ast::{Conditional, ForLoop, TemplateNode, VariableRef};
pub use context::{TemplateContext, TemplateValue};
pub use error::{TemplateError, TemplateResult};
pub use parser::Template;
