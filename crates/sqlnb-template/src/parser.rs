/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template parser.
//!
//! Parsing happens in two passes: a scanner splits the source into literal
//! text and `$...$` directives, then a recursive-descent pass nests the
//! conditional and loop directives into [`TemplateNode`]s.
//!
//! A block directive (`$if$`, `$else$`, `$for$`, ...) that is alone on its
//! line swallows that whole line, so templates can put control flow on
//! lines of their own without leaving blank lines in the output.

use std::path::Path;

use crate::ast::{Conditional, ForLoop, TemplateNode, VariableRef};
use crate::error::{TemplateError, TemplateResult};

/// A compiled template ready for evaluation.
#[derive(Debug, Clone)]
pub struct Template {
    /// The parsed template AST.
    pub(crate) nodes: Vec<TemplateNode>,
}

impl Template {
    /// Compile a template from source text.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        let tokens = scan(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let (nodes, terminator) = parser.parse_block()?;
        if let Some((offset, token)) = terminator {
            return Err(TemplateError::parse(
                offset,
                format!("unexpected {}", token.describe()),
            ));
        }
        Ok(Self { nodes })
    }

    /// Read and compile a template file.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::compile(&source)
    }

    /// The parsed nodes.
    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Text(String),
    Variable(VariableRef),
    If(VariableRef),
    ElseIf(VariableRef),
    Else,
    EndIf,
    For(VariableRef),
    Sep,
    EndFor,
}

impl Token {
    fn is_block(&self) -> bool {
        !matches!(self, Token::Text(_) | Token::Variable(_))
    }

    fn describe(&self) -> String {
        match self {
            Token::Text(_) => "text".to_string(),
            Token::Variable(v) => format!("${}$", v.name()),
            Token::If(v) => format!("$if({})$", v.name()),
            Token::ElseIf(v) => format!("$elseif({})$", v.name()),
            Token::Else => "$else$".to_string(),
            Token::EndIf => "$endif$".to_string(),
            Token::For(v) => format!("$for({})$", v.name()),
            Token::Sep => "$sep$".to_string(),
            Token::EndFor => "$endfor$".to_string(),
        }
    }
}

/// Split the source into text and directive tokens, tagged with byte offsets.
fn scan(source: &str) -> TemplateResult<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(rel) = source[pos..].find('$') {
        let start = pos + rel;
        text.push_str(&source[pos..start]);
        let rest = &source[start + 1..];

        if rest.starts_with('$') {
            text.push('$');
            pos = start + 2;
            continue;
        }

        if rest.starts_with("--") {
            pos = rest
                .find('\n')
                .map(|i| start + 1 + i + 1)
                .unwrap_or(source.len());
            continue;
        }

        let (inner, after) = if let Some(braced) = rest.strip_prefix('{') {
            let close = braced
                .find('}')
                .ok_or_else(|| TemplateError::parse(start, "unterminated ${...} directive"))?;
            (&braced[..close], start + 2 + close + 1)
        } else {
            let close = rest
                .find('$')
                .ok_or_else(|| TemplateError::parse(start, "unterminated $...$ directive"))?;
            (&rest[..close], start + 1 + close + 1)
        };

        let token = parse_directive(inner.trim(), start)?;
        pos = after;

        if token.is_block() && is_standalone(source, start, after) {
            let trimmed_len = text.trim_end_matches([' ', '\t']).len();
            text.truncate(trimmed_len);
            pos = skip_line_end(source, after);
        }

        if !text.is_empty() {
            tokens.push((text_start, Token::Text(std::mem::take(&mut text))));
        }
        tokens.push((start, token));
        text_start = pos;
    }

    text.push_str(&source[pos..]);
    if !text.is_empty() {
        tokens.push((text_start, Token::Text(text)));
    }
    Ok(tokens)
}

/// A directive is standalone when only whitespace surrounds it on its line.
fn is_standalone(source: &str, start: usize, after: usize) -> bool {
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix_blank = source[line_start..start]
        .chars()
        .all(|c| c == ' ' || c == '\t');
    let line_end = source[after..]
        .find('\n')
        .map(|i| after + i)
        .unwrap_or(source.len());
    let suffix_blank = source[after..line_end]
        .chars()
        .all(|c| c == ' ' || c == '\t' || c == '\r');
    prefix_blank && suffix_blank
}

fn skip_line_end(source: &str, after: usize) -> usize {
    match source[after..].find('\n') {
        Some(i) => after + i + 1,
        None => source.len(),
    }
}

fn parse_directive(inner: &str, offset: usize) -> TemplateResult<Token> {
    match inner {
        "else" => return Ok(Token::Else),
        "endif" => return Ok(Token::EndIf),
        "sep" => return Ok(Token::Sep),
        "endfor" => return Ok(Token::EndFor),
        _ => {}
    }

    for (keyword, make) in [
        ("elseif", Token::ElseIf as fn(VariableRef) -> Token),
        ("if", Token::If),
        ("for", Token::For),
    ] {
        if let Some(args) = inner.strip_prefix(keyword).and_then(|r| r.strip_prefix('(')) {
            let name = args.strip_suffix(')').ok_or_else(|| {
                TemplateError::parse(offset, format!("missing ')' in {keyword} directive"))
            })?;
            return Ok(make(parse_variable(name.trim(), offset)?));
        }
    }

    // `$var[, ]$` carries a literal list separator
    if let Some((name, sep)) = inner.split_once('[') {
        let sep = sep
            .strip_suffix(']')
            .ok_or_else(|| TemplateError::parse(offset, "missing ']' after separator"))?;
        let mut var = parse_variable(name, offset)?;
        var.separator = Some(sep.to_string());
        return Ok(Token::Variable(var));
    }

    Ok(Token::Variable(parse_variable(inner, offset)?))
}

fn parse_variable(name: &str, offset: usize) -> TemplateResult<VariableRef> {
    let valid = !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(is_name_char));
    if !valid {
        return Err(TemplateError::parse(
            offset,
            format!("invalid variable name '{name}'"),
        ));
    }
    Ok(VariableRef::parse(name))
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Parse nodes until a closing/branching directive or end of input.
    ///
    /// Returns the nodes and the directive that stopped the block.
    fn parse_block(&mut self) -> TemplateResult<(Vec<TemplateNode>, Option<(usize, Token)>)> {
        let mut nodes = Vec::new();
        while let Some((offset, token)) = self.next() {
            match token {
                Token::Text(text) => nodes.push(TemplateNode::Literal(text)),
                Token::Variable(var) => nodes.push(TemplateNode::Variable(var)),
                Token::If(condition) => nodes.push(self.parse_conditional(offset, condition)?),
                Token::For(var) => nodes.push(self.parse_for_loop(offset, var)?),
                terminator => return Ok((nodes, Some((offset, terminator)))),
            }
        }
        Ok((nodes, None))
    }

    fn parse_conditional(
        &mut self,
        offset: usize,
        condition: VariableRef,
    ) -> TemplateResult<TemplateNode> {
        let mut branches = Vec::new();
        let mut condition = condition;
        loop {
            let (body, terminator) = self.parse_block()?;
            branches.push((condition, body));
            match terminator {
                Some((_, Token::ElseIf(next))) => condition = next,
                Some((_, Token::Else)) => {
                    let (else_body, terminator) = self.parse_block()?;
                    self.expect_end(offset, terminator, Token::EndIf, "$if$")?;
                    return Ok(TemplateNode::Conditional(Conditional {
                        branches,
                        else_branch: Some(else_body),
                    }));
                }
                Some((_, Token::EndIf)) => {
                    return Ok(TemplateNode::Conditional(Conditional {
                        branches,
                        else_branch: None,
                    }));
                }
                other => return Err(unterminated(offset, other, "$if$")),
            }
        }
    }

    fn parse_for_loop(&mut self, offset: usize, var: VariableRef) -> TemplateResult<TemplateNode> {
        let (body, terminator) = self.parse_block()?;
        let separator = match terminator {
            Some((_, Token::EndFor)) => None,
            Some((_, Token::Sep)) => {
                let (sep_body, terminator) = self.parse_block()?;
                self.expect_end(offset, terminator, Token::EndFor, "$for$")?;
                Some(sep_body)
            }
            other => return Err(unterminated(offset, other, "$for$")),
        };
        Ok(TemplateNode::ForLoop(ForLoop {
            var,
            body,
            separator,
        }))
    }

    fn expect_end(
        &self,
        offset: usize,
        terminator: Option<(usize, Token)>,
        expected: Token,
        opener: &str,
    ) -> TemplateResult<()> {
        match terminator {
            Some((_, token)) if token == expected => Ok(()),
            other => Err(unterminated(offset, other, opener)),
        }
    }
}

fn unterminated(offset: usize, found: Option<(usize, Token)>, opener: &str) -> TemplateError {
    match found {
        Some((at, token)) => TemplateError::parse(
            at,
            format!("unexpected {} inside {opener}", token.describe()),
        ),
        None => TemplateError::parse(offset, format!("unterminated {opener}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_only() {
        let template = Template::compile("plain text").unwrap();
        assert_eq!(
            template.nodes(),
            &[TemplateNode::Literal("plain text".to_string())]
        );
    }

    #[test]
    fn test_escaped_dollar() {
        let template = Template::compile("costs $$5").unwrap();
        assert_eq!(
            template.nodes(),
            &[TemplateNode::Literal("costs $5".to_string())]
        );
    }

    #[test]
    fn test_variable_forms() {
        let template = Template::compile("$a.b$ ${c}").unwrap();
        assert_eq!(template.nodes().len(), 3);
        let TemplateNode::Variable(first) = &template.nodes()[0] else {
            panic!("expected variable");
        };
        assert_eq!(first.path, vec!["a", "b"]);
    }

    #[test]
    fn test_separator_variable() {
        let template = Template::compile("$tags[, ]$").unwrap();
        let TemplateNode::Variable(var) = &template.nodes()[0] else {
            panic!("expected variable");
        };
        assert_eq!(var.separator.as_deref(), Some(", "));
    }

    #[test]
    fn test_comment_is_dropped() {
        let template = Template::compile("a\n$-- note\nb").unwrap();
        assert_eq!(
            template.nodes(),
            &[TemplateNode::Literal("a\nb".to_string())]
        );
    }

    #[test]
    fn test_standalone_directive_swallows_line() {
        let template = Template::compile("a\n  $if(x)$\nb\n$endif$\nc").unwrap();
        let TemplateNode::Conditional(cond) = &template.nodes()[1] else {
            panic!("expected conditional");
        };
        assert_eq!(template.nodes()[0], TemplateNode::Literal("a\n".to_string()));
        assert_eq!(cond.branches[0].1, vec![TemplateNode::Literal("b\n".to_string())]);
        assert_eq!(template.nodes()[2], TemplateNode::Literal("c".to_string()));
    }

    #[test]
    fn test_unterminated_if() {
        let err = Template::compile("$if(x)$ never closed").unwrap_err();
        assert!(err.to_string().contains("unterminated $if$"));
    }

    #[test]
    fn test_stray_endfor() {
        let err = Template::compile("text $endfor$").unwrap_err();
        assert!(err.to_string().contains("unexpected $endfor$"));
    }

    #[test]
    fn test_mismatched_close() {
        let err = Template::compile("$for(x)$ a $endif$").unwrap_err();
        assert!(err.to_string().contains("inside $for$"));
    }

    #[test]
    fn test_unterminated_directive() {
        assert!(Template::compile("price $5").is_err());
        assert!(Template::compile("${oops").is_err());
    }

    #[test]
    fn test_invalid_variable_name() {
        assert!(Template::compile("$a..b$").is_err());
        assert!(Template::compile("$if(a b)$x$endif$").is_err());
    }
}
