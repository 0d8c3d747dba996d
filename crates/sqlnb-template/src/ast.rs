/*
 * ast.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template AST types.

/// A node in the template AST.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    /// Literal text to be output as-is.
    Literal(String),

    /// Variable interpolation: `$var$` or `$obj.field$`
    Variable(VariableRef),

    /// Conditional block: `$if(var)$...$else$...$endif$`
    Conditional(Conditional),

    /// For loop: `$for(var)$...$sep$...$endfor$`
    ForLoop(ForLoop),
}

/// A reference to a (possibly nested) variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    /// Path components, e.g. `["cells", "source"]` for `$cells.source$`.
    pub path: Vec<String>,
    /// Literal separator used when the value is a list (`$var[, ]$`).
    pub separator: Option<String>,
}

impl VariableRef {
    /// Parse a dotted variable name.
    pub fn parse(name: &str) -> Self {
        Self {
            path: name.split('.').map(str::to_string).collect(),
            separator: None,
        }
    }

    /// The dotted name, for diagnostics.
    pub fn name(&self) -> String {
        self.path.join(".")
    }
}

/// Conditional block: `$if(var)$...$elseif(var)$...$else$...$endif$`
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// List of (condition, body) pairs for if/elseif branches.
    pub branches: Vec<(VariableRef, Vec<TemplateNode>)>,
    /// Optional else branch.
    pub else_branch: Option<Vec<TemplateNode>>,
}

/// For loop: `$for(var)$...$sep$...$endfor$`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    /// Variable to iterate over.
    pub var: VariableRef,
    /// Loop body.
    pub body: Vec<TemplateNode>,
    /// Optional separator between iterations (from `$sep$`).
    pub separator: Option<Vec<TemplateNode>>,
}
