/*
 * emit/latex.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * LaTeX-specific rewriting of converted cells.
 */

use std::path::Path;

use crate::tags::{self, TagSet};

/// Lines pandoc emits inside lists that the templates handle themselves.
const DROPPED_LINE_PREFIXES: [&str; 2] = ["\\def\\labelenumi", "\\tightlist"];

/// Pandoc's restart counter; only dropped where a list continues.
const ENUM_COUNTER: &str = "\\setcounter{enumi}";

/// Tags that stitch consecutive cells into one list environment.
struct ListSegment {
    environment: &'static str,
    start: &'static str,
    cont: &'static str,
    end: &'static str,
}

const LIST_SEGMENTS: [ListSegment; 2] = [
    ListSegment {
        environment: "enumerate",
        start: tags::ENUM_START,
        cont: tags::ENUM_CONT,
        end: tags::ENUM_END,
    },
    ListSegment {
        environment: "itemize",
        start: tags::ITEM_START,
        cont: tags::ITEM_CONT,
        end: tags::ITEM_END,
    },
];

/// Turn a highlighted code block into inline emphasis.
pub fn source_block(converted: &str) -> String {
    converted
        .replace("\\begin{Highlighting}[]", "\\emph{")
        .replace("\\end{Highlighting}", "}")
}

/// The figure that stands in for a query result.
pub fn result_figure(image: &Path) -> String {
    format!(
        "\\begin{{center}}\n\\includegraphics[width=\\maxwidth{{\\linewidth}}]{{{}}}\n\\end{{center}}",
        image.display()
    )
}

/// Clean up pandoc's LaTeX for one narrative cell.
///
/// Cells tagged `enum:*`/`item:*` are list segments: the boundaries pandoc
/// adds around each segment are removed so consecutive cells render as one
/// list. A `\setcounter{enumi}` line is kept unless the cell continues a
/// numbered list.
pub fn post_process(converted: &str, tags: &TagSet) -> String {
    let continued = tags.contains(tags::ENUM_CONT) || tags.contains(tags::ENUM_END);
    let mut text: String = converted
        .split_inclusive('\n')
        .filter(|line| {
            let line = line.trim_start();
            !DROPPED_LINE_PREFIXES.iter().any(|p| line.starts_with(p))
                && !(continued && line.starts_with(ENUM_COUNTER))
        })
        .collect();

    for segment in &LIST_SEGMENTS {
        let begin = format!("\\begin{{{}}}", segment.environment);
        let end = format!("\\end{{{}}}", segment.environment);

        if tags.contains(segment.start) {
            text = remove_last(&text, &end);
        } else if tags.contains(segment.cont) {
            text = remove_first(&text, &begin);
            text = remove_last(&text, &end);
        } else if tags.contains(segment.end) {
            text = remove_first(&text, &begin);
            if !text.contains(&end) {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
                text.push_str(&end);
                text.push('\n');
            }
        }
    }
    text
}

fn remove_first(text: &str, needle: &str) -> String {
    match text.find(needle) {
        Some(at) => splice_out(text, at, needle.len()),
        None => text.to_string(),
    }
}

fn remove_last(text: &str, needle: &str) -> String {
    match text.rfind(needle) {
        Some(at) => splice_out(text, at, needle.len()),
        None => text.to_string(),
    }
}

/// Remove `len` bytes at `at`, plus the newline that ends the command's line.
fn splice_out(text: &str, at: usize, len: usize) -> String {
    let mut end = at + len;
    if text[end..].starts_with('\n') {
        end += 1;
    }
    format!("{}{}", &text[..at], &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST: &str = "\\begin{enumerate}\n\\def\\labelenumi{\\arabic{enumi}.}\n\\setcounter{enumi}{2}\n\\tightlist\n\\item\n  Count rows\n\\end{enumerate}\n";

    fn tagged(tag: &str) -> TagSet {
        [tag].into_iter().collect()
    }

    #[test]
    fn test_drops_pandoc_list_noise_but_keeps_start_counter() {
        let out = post_process(LIST, &TagSet::new());
        assert_eq!(
            out,
            "\\begin{enumerate}\n\\setcounter{enumi}{2}\n\\item\n  Count rows\n\\end{enumerate}\n"
        );
    }

    #[test]
    fn test_enum_start_keeps_list_open() {
        let out = post_process(LIST, &tagged("enum:start"));
        assert_eq!(out, "\\begin{enumerate}\n\\setcounter{enumi}{2}\n\\item\n  Count rows\n");
    }

    #[test]
    fn test_enum_cont_strips_both_boundaries() {
        let out = post_process(LIST, &tagged("enum:cont"));
        assert_eq!(out, "\\item\n  Count rows\n");
    }

    #[test]
    fn test_enum_end_closes_list() {
        let out = post_process(LIST, &tagged("enum:end"));
        assert_eq!(out, "\\item\n  Count rows\n\\end{enumerate}\n");

        let out = post_process("Some closing text.\n", &tagged("enum:end"));
        assert_eq!(out, "Some closing text.\n\\end{enumerate}\n");
    }

    #[test]
    fn test_itemize_segments() {
        let list = "\\begin{itemize}\n\\tightlist\n\\item\n  a\n\\end{itemize}\n";
        assert_eq!(post_process(list, &tagged("item:start")), "\\begin{itemize}\n\\item\n  a\n");
        assert_eq!(post_process(list, &tagged("item:cont")), "\\item\n  a\n");
        assert_eq!(post_process(list, &tagged("item:end")), "\\item\n  a\n\\end{itemize}\n");
    }

    #[test]
    fn test_source_block_emphasis() {
        let converted = "\\begin{Shaded}\n\\begin{Highlighting}[]\n\\KeywordTok{SELECT} \\DecValTok{1}\n\\end{Highlighting}\n\\end{Shaded}\n";
        let out = source_block(converted);
        assert!(out.contains("\\emph{\n\\KeywordTok{SELECT}"));
        assert!(!out.contains("Highlighting"));
    }

    #[test]
    fn test_result_figure() {
        let figure = result_figure(Path::new("out/images/ex1_2.png"));
        assert_eq!(
            figure,
            "\\begin{center}\n\\includegraphics[width=\\maxwidth{\\linewidth}]{out/images/ex1_2.png}\n\\end{center}"
        );
    }
}
