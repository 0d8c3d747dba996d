/*
 * context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template value and context types.
//!
//! These types are independent of the notebook model. Conversion from
//! notebook metadata and projected cells happens in `sqlnb-core`.

use std::collections::HashMap;

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TemplateValue {
    /// A string value.
    String(String),

    /// A boolean value.
    Bool(bool),

    /// A list of values.
    List(Vec<TemplateValue>),

    /// A map of string keys to values.
    Map(HashMap<String, TemplateValue>),

    /// An explicit null (e.g. `author: null` in front-matter).
    Null,

    /// A field the caller knows about but that was never set.
    ///
    /// The "undefined" marker lives in the context, not in the output: a
    /// context holding `Undefined` is distinguishable from one holding
    /// `Null`, `""` or no entry at all, and templates detect it with
    /// `$if(field)$`. Rendered directly it produces nothing, so a template
    /// that forgets the conditional gets an empty field rather than a
    /// literal placeholder in the document.
    #[default]
    Undefined,
}

impl TemplateValue {
    /// Check if this value is "truthy" for conditional evaluation.
    ///
    /// Truthiness rules (matching Pandoc):
    /// - Any non-empty map is truthy
    /// - Any array containing at least one truthy value is truthy
    /// - Any non-empty string is truthy (even "false")
    /// - Boolean true is truthy
    /// - Everything else is falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            TemplateValue::Bool(b) => *b,
            TemplateValue::String(s) => !s.is_empty(),
            TemplateValue::List(items) => items.iter().any(|v| v.is_truthy()),
            TemplateValue::Map(m) => !m.is_empty(),
            TemplateValue::Null | TemplateValue::Undefined => false,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, TemplateValue::Undefined)
    }

    /// Get a nested field by path.
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(self);
        };

        match self {
            TemplateValue::Map(m) => m.get(*first).and_then(|v| v.get_path(rest)),
            _ => None,
        }
    }

    /// Render this value as a string for output.
    ///
    /// - String: returned as-is
    /// - Bool: "true" or "" (empty for false)
    /// - List: concatenation of rendered elements
    /// - Map: "true"
    /// - Null, Undefined: ""
    pub fn render(&self) -> String {
        match self {
            TemplateValue::String(s) => s.clone(),
            TemplateValue::Bool(true) => "true".to_string(),
            TemplateValue::Bool(false) => String::new(),
            TemplateValue::List(items) => items.iter().map(|v| v.render()).collect(),
            TemplateValue::Map(_) => "true".to_string(),
            TemplateValue::Null | TemplateValue::Undefined => String::new(),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        TemplateValue::String(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        TemplateValue::String(value)
    }
}

impl From<bool> for TemplateValue {
    fn from(value: bool) -> Self {
        TemplateValue::Bool(value)
    }
}

impl From<&serde_json::Value> for TemplateValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TemplateValue::Null,
            serde_json::Value::Bool(b) => TemplateValue::Bool(*b),
            serde_json::Value::Number(n) => TemplateValue::String(n.to_string()),
            serde_json::Value::String(s) => TemplateValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                TemplateValue::List(items.iter().map(TemplateValue::from).collect())
            }
            serde_json::Value::Object(entries) => TemplateValue::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), TemplateValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A context for template evaluation containing variable bindings.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Variable bindings at this level.
    variables: HashMap<String, TemplateValue>,

    /// Parent context for nested scopes (e.g., inside for loops).
    parent: Option<Box<TemplateContext>>,
}

impl TemplateContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a variable into the context.
    pub fn insert(&mut self, key: impl Into<String>, value: TemplateValue) {
        self.variables.insert(key.into(), value);
    }

    /// Get a variable from the context, checking parent scopes.
    pub fn get(&self, key: &str) -> Option<&TemplateValue> {
        self.variables
            .get(key)
            .or_else(|| self.parent.as_ref().and_then(|p| p.get(key)))
    }

    /// Get a variable by path (e.g., `["cells", "source"]`).
    pub fn get_path(&self, path: &[&str]) -> Option<&TemplateValue> {
        let (first, rest) = path.split_first()?;
        self.get(first).and_then(|v| v.get_path(rest))
    }

    /// Create a child context for a nested scope (e.g., for loop iteration).
    ///
    /// The child context inherits access to parent variables.
    pub fn child(&self) -> TemplateContext {
        TemplateContext {
            variables: HashMap::new(),
            parent: Some(Box::new(self.clone())),
        }
    }
}
