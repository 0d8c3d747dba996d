/*
 * evaluator.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template evaluation engine.
//!
//! Evaluation walks the parsed nodes against a context and appends straight
//! into an output string.

use crate::ast::{Conditional, ForLoop, TemplateNode, VariableRef};
use crate::context::{TemplateContext, TemplateValue};
use crate::error::TemplateResult;
use crate::parser::Template;

impl Template {
    /// Render this template with the given context.
    pub fn render(&self, context: &TemplateContext) -> TemplateResult<String> {
        let mut out = String::new();
        evaluate(&self.nodes, context, &mut out)?;
        Ok(out)
    }
}

/// Evaluate a list of template nodes, appending to `out`.
pub fn evaluate(
    nodes: &[TemplateNode],
    context: &TemplateContext,
    out: &mut String,
) -> TemplateResult<()> {
    for node in nodes {
        evaluate_node(node, context, out)?;
    }
    Ok(())
}

fn evaluate_node(
    node: &TemplateNode,
    context: &TemplateContext,
    out: &mut String,
) -> TemplateResult<()> {
    match node {
        TemplateNode::Literal(text) => out.push_str(text),
        TemplateNode::Variable(var) => render_variable(var, context, out),
        TemplateNode::Conditional(cond) => evaluate_conditional(cond, context, out)?,
        TemplateNode::ForLoop(for_loop) => evaluate_for_loop(for_loop, context, out)?,
    }
    Ok(())
}

fn resolve_variable<'a>(
    var: &VariableRef,
    context: &'a TemplateContext,
) -> Option<&'a TemplateValue> {
    let path: Vec<&str> = var.path.iter().map(String::as_str).collect();
    context.get_path(&path)
}

fn render_variable(var: &VariableRef, context: &TemplateContext, out: &mut String) {
    let Some(value) = resolve_variable(var, context) else {
        return;
    };
    // Literal separator for arrays: $var[, ]$
    if let (Some(sep), TemplateValue::List(items)) = (&var.separator, value) {
        let rendered: Vec<String> = items.iter().map(TemplateValue::render).collect();
        out.push_str(&rendered.join(sep));
        return;
    }
    out.push_str(&value.render());
}

fn evaluate_conditional(
    cond: &Conditional,
    context: &TemplateContext,
    out: &mut String,
) -> TemplateResult<()> {
    for (condition, body) in &cond.branches {
        if resolve_variable(condition, context).is_some_and(TemplateValue::is_truthy) {
            return evaluate(body, context, out);
        }
    }
    match &cond.else_branch {
        Some(else_body) => evaluate(else_body, context, out),
        None => Ok(()),
    }
}

fn evaluate_for_loop(
    for_loop: &ForLoop,
    context: &TemplateContext,
    out: &mut String,
) -> TemplateResult<()> {
    let items: Vec<&TemplateValue> = match resolve_variable(&for_loop.var, context) {
        Some(TemplateValue::List(items)) => items.iter().collect(),
        Some(v) if v.is_truthy() => vec![v],
        _ => Vec::new(),
    };

    // Bind to the last path component and to `it`
    let var_name = for_loop.var.path.last().map(String::as_str).unwrap_or("it");

    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            if let Some(separator) = &for_loop.separator {
                evaluate(separator, context, out)?;
            }
        }
        let mut child = context.child();
        child.insert(var_name, item.clone());
        child.insert("it", item.clone());
        evaluate(&for_loop.body, &child, out)?;
    }
    Ok(())
}
