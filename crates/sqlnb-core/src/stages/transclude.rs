/*
 * stages/transclude.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Splices referenced notebooks in place of `{{name}}` cells.
 */

//! Transclusion.
//!
//! A markdown or raw cell whose whole (trimmed) body is `{{name}}` is
//! replaced by all cells of `<base>/name.ipynb`. Cells with a reference plus
//! other text are left alone.
//!
//! [`resolve_transclusion`] is a single pass: references inside the
//! spliced cells stay as they are. [`resolve_recursive`] keeps expanding
//! until no reference is left, and fails on a cycle.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::Result;
use crate::error::SqlnbError;
use crate::notebook::{Cell, Notebook};
use crate::stage::NotebookStage;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{\s*([^{}]+?)\s*\}\}$").expect("Invalid regex pattern for transclusion")
});

/// The referenced notebook name, if this cell is a transclusion reference.
pub fn reference_name(cell: &Cell) -> Option<&str> {
    if !(cell.is_markdown() || cell.is_raw()) {
        return None;
    }
    REFERENCE
        .captures(cell.source.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `base/name`, with `.ipynb` appended when missing.
pub fn reference_path(base: &Path, name: &str) -> PathBuf {
    if name.ends_with(".ipynb") {
        base.join(name)
    } else {
        base.join(format!("{name}.ipynb"))
    }
}

/// Replace each reference cell with the cells of the notebook it names.
pub fn resolve_transclusion(notebook: Notebook, base: &Path) -> Result<Notebook> {
    splice(notebook, base, None)
}

/// Resolve references until none are left.
///
/// `origin` is the path of the notebook being resolved, if it has one; it
/// counts as the start of every inclusion chain.
pub fn resolve_recursive(notebook: Notebook, base: &Path, origin: Option<&Path>) -> Result<Notebook> {
    let mut chain: Vec<PathBuf> = origin.map(chain_key).into_iter().collect();
    splice(notebook, base, Some(&mut chain))
}

fn splice(
    mut notebook: Notebook,
    base: &Path,
    mut chain: Option<&mut Vec<PathBuf>>,
) -> Result<Notebook> {
    let cells = std::mem::take(&mut notebook.cells);
    let mut out = Vec::with_capacity(cells.len());

    for cell in cells {
        let Some(name) = reference_name(&cell) else {
            out.push(cell);
            continue;
        };
        let path = reference_path(base, name);
        tracing::debug!(path = %path.display(), "Transcluding notebook");
        let included = Notebook::read(&path)?;

        match chain.as_deref_mut() {
            None => out.extend(included.cells),
            Some(chain) => {
                let key = chain_key(&path);
                if chain.contains(&key) {
                    let cycle: Vec<String> = chain
                        .iter()
                        .chain(std::iter::once(&key))
                        .map(|p| p.display().to_string())
                        .collect();
                    return Err(SqlnbError::resource(
                        path,
                        format!("transclusion cycle: {}", cycle.join(" -> ")),
                    ));
                }
                chain.push(key);
                let expanded = splice(included, base, Some(&mut *chain))?;
                chain.pop();
                out.extend(expanded.cells);
            }
        }
    }

    Ok(notebook.with_cells(out))
}

fn chain_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Pipeline stage for `transclude`.
pub struct TranscludeStage {
    base: PathBuf,
    recursive: bool,
    origin: Option<PathBuf>,
}

impl TranscludeStage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            recursive: false,
            origin: None,
        }
    }

    pub fn recursive(mut self, origin: Option<PathBuf>) -> Self {
        self.recursive = true;
        self.origin = origin;
        self
    }
}

impl NotebookStage for TranscludeStage {
    fn name(&self) -> &str {
        if self.recursive {
            "transclude-recursive"
        } else {
            "transclude"
        }
    }

    fn run(&self, notebook: Notebook) -> Result<Notebook> {
        if self.recursive {
            resolve_recursive(notebook, &self.base, self.origin.as_deref())
        } else {
            resolve_transclusion(notebook, &self.base)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagSet;

    #[test]
    fn test_reference_name() {
        let md = |s: &str| Cell::markdown(s, TagSet::new());
        assert_eq!(reference_name(&md("{{lesson1}}")), Some("lesson1"));
        assert_eq!(reference_name(&md("  {{ part/two.ipynb }}\n")), Some("part/two.ipynb"));
        assert_eq!(reference_name(&Cell::raw("{{x}}", TagSet::new())), Some("x"));
        assert_eq!(reference_name(&md("{{lesson1}} and more")), None);
        assert_eq!(reference_name(&md("see {{lesson1}}")), None);
        assert_eq!(reference_name(&Cell::code("{{lesson1}}", TagSet::new())), None);
    }

    #[test]
    fn test_reference_path() {
        let base = Path::new("/course");
        assert_eq!(reference_path(base, "lesson1"), PathBuf::from("/course/lesson1.ipynb"));
        assert_eq!(reference_path(base, "l2.ipynb"), PathBuf::from("/course/l2.ipynb"));
    }

    #[test]
    fn test_missing_reference_is_resource_error() {
        let dir = tempfile::tempdir().unwrap();
        let nb = Notebook::new(vec![Cell::markdown("{{lesson1}}", TagSet::new())]);
        let err = resolve_transclusion(nb, dir.path()).unwrap_err();
        match err {
            SqlnbError::Resource { path, .. } => assert!(path.ends_with("lesson1.ipynb")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
