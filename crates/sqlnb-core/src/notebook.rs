/*
 * notebook.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Notebook document model.
 */

//! Notebook document model.
//!
//! This is the subset of the Jupyter notebook format (v4) the pipeline needs:
//! an ordered list of cells, each with a source, a tag set and, for code
//! cells, outputs. Fields the pipeline does not interpret (cell ids,
//! execution counts, attachments, kernelspec metadata, ...) are kept in
//! `extra` maps so notebooks round-trip.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;
use crate::error::SqlnbError;
use crate::tags::TagSet;

/// A notebook: ordered cells plus document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    #[serde(default = "default_nbformat")]
    pub nbformat: u32,

    #[serde(default = "default_nbformat_minor")]
    pub nbformat_minor: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_nbformat() -> u32 {
    4
}

fn default_nbformat_minor() -> u32 {
    5
}

impl Default for Notebook {
    fn default() -> Self {
        Self {
            cells: Vec::new(),
            metadata: Map::new(),
            nbformat: default_nbformat(),
            nbformat_minor: default_nbformat_minor(),
            extra: Map::new(),
        }
    }
}

impl Notebook {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a notebook file.
    ///
    /// A missing file or malformed content is a resource error carrying the
    /// offending path.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlnbError::resource(path, format!("cannot read notebook: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| SqlnbError::resource(path, format!("malformed notebook: {e}")))
    }

    /// Serialize with the one-space indentation Jupyter uses.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        let mut json = String::from_utf8_lossy(&buf).into_owned();
        json.push('\n');
        Ok(json)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        tracing::info!(path = %path.display(), cells = self.cells.len(), "Wrote notebook");
        Ok(())
    }

    /// Replace the cell list, keeping document metadata.
    pub fn with_cells(self, cells: Vec<Cell>) -> Self {
        Self { cells, ..self }
    }
}

/// Variant-specific cell content.
#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Code { outputs: Vec<CellOutput> },
    Markdown,
    Raw,
}

/// A single notebook cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCell", into = "RawCell")]
pub struct Cell {
    pub kind: CellKind,
    pub source: String,
    pub metadata: CellMetadata,
    /// Unknown cell fields (`id`, `execution_count`, `attachments`, ...).
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMetadata {
    #[serde(default, skip_serializing_if = "TagSet::is_empty")]
    pub tags: TagSet,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Cell {
    pub fn markdown(source: impl Into<String>, tags: TagSet) -> Self {
        Self::with_kind(CellKind::Markdown, source, tags)
    }

    pub fn code(source: impl Into<String>, tags: TagSet) -> Self {
        let mut cell = Self::with_kind(CellKind::Code { outputs: Vec::new() }, source, tags);
        cell.extra.insert("execution_count".to_string(), Value::Null);
        cell
    }

    pub fn raw(source: impl Into<String>, tags: TagSet) -> Self {
        Self::with_kind(CellKind::Raw, source, tags)
    }

    fn with_kind(kind: CellKind, source: impl Into<String>, tags: TagSet) -> Self {
        Self {
            kind,
            source: source.into(),
            metadata: CellMetadata {
                tags,
                extra: Map::new(),
            },
            extra: Map::new(),
        }
    }

    pub fn cell_type(&self) -> &'static str {
        match self.kind {
            CellKind::Code { .. } => "code",
            CellKind::Markdown => "markdown",
            CellKind::Raw => "raw",
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self.kind, CellKind::Code { .. })
    }

    pub fn is_markdown(&self) -> bool {
        matches!(self.kind, CellKind::Markdown)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.kind, CellKind::Raw)
    }

    pub fn tags(&self) -> &TagSet {
        &self.metadata.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.metadata.tags.contains(tag)
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.metadata.tags = tags;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Outputs of a code cell; empty for other cells.
    pub fn outputs(&self) -> &[CellOutput] {
        match &self.kind {
            CellKind::Code { outputs } => outputs,
            _ => &[],
        }
    }

    /// Turn this cell into a markdown cell with the given body.
    ///
    /// Code-only fields (`execution_count`, outputs) are dropped; the cell
    /// keeps its id and other metadata.
    pub fn into_markdown(mut self, source: impl Into<String>) -> Self {
        self.kind = CellKind::Markdown;
        self.source = source.into();
        self.extra.remove("execution_count");
        self
    }

    /// Turn this cell into a code cell with no outputs.
    pub fn into_code(mut self, source: impl Into<String>) -> Self {
        self.kind = CellKind::Code { outputs: Vec::new() };
        self.source = source.into();
        self.extra
            .insert("execution_count".to_string(), Value::Null);
        self
    }

    /// Give this cell a new id if it has one, so copies stay unique.
    pub fn with_fresh_id(mut self) -> Self {
        if self.extra.contains_key("id") {
            self.extra.insert("id".to_string(), Value::String(fresh_cell_id()));
        }
        self
    }
}

/// A cell id in the shape Jupyter generates.
pub fn fresh_cell_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Serialized shape of a cell.
#[derive(Serialize, Deserialize)]
struct RawCell {
    cell_type: String,

    #[serde(default, with = "multiline")]
    source: String,

    #[serde(default)]
    metadata: CellMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    outputs: Option<Vec<CellOutput>>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawCell> for Cell {
    type Error = String;

    fn try_from(raw: RawCell) -> std::result::Result<Self, Self::Error> {
        let kind = match raw.cell_type.as_str() {
            "code" => CellKind::Code {
                outputs: raw.outputs.unwrap_or_default(),
            },
            "markdown" => CellKind::Markdown,
            "raw" => CellKind::Raw,
            other => return Err(format!("unknown cell_type '{other}'")),
        };
        Ok(Cell {
            kind,
            source: raw.source,
            metadata: raw.metadata,
            extra: raw.extra,
        })
    }
}

impl From<Cell> for RawCell {
    fn from(cell: Cell) -> Self {
        let cell_type = cell.cell_type().to_string();
        let outputs = match cell.kind {
            CellKind::Code { outputs } => Some(outputs),
            _ => None,
        };
        RawCell {
            cell_type,
            source: cell.source,
            metadata: cell.metadata,
            outputs,
            extra: cell.extra,
        }
    }
}

/// One execution result of a code cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum CellOutput {
    Stream {
        name: String,
        #[serde(with = "multiline")]
        text: String,
    },
    DisplayData {
        #[serde(default)]
        data: Map<String, Value>,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    ExecuteResult {
        execution_count: Option<u64>,
        #[serde(default)]
        data: Map<String, Value>,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    Error {
        ename: String,
        evalue: String,
        #[serde(default)]
        traceback: Vec<String>,
    },
}

impl CellOutput {
    /// A `text/plain` execute result.
    pub fn text_result(text: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("text/plain".to_string(), Value::String(text.into()));
        CellOutput::ExecuteResult {
            execution_count: None,
            data,
            metadata: Map::new(),
        }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        CellOutput::Stream {
            name: "stdout".to_string(),
            text: text.into(),
        }
    }

    /// The textual payload of this output.
    ///
    /// `text/plain` for rich outputs, the text for streams and
    /// `ename: evalue` for errors.
    pub fn text_payload(&self) -> Option<String> {
        match self {
            CellOutput::Stream { text, .. } => Some(text.clone()),
            CellOutput::DisplayData { data, .. } | CellOutput::ExecuteResult { data, .. } => {
                data.get("text/plain").and_then(joined_text)
            }
            CellOutput::Error { ename, evalue, .. } => Some(format!("{ename}: {evalue}")),
        }
    }
}

/// Join a string or list-of-lines JSON value.
fn joined_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(lines) => Some(lines.iter().filter_map(Value::as_str).collect()),
        _ => None,
    }
}

/// Multiline strings are stored either as one string or a list of lines.
mod multiline {
    use serde::de::{Deserializer, Error};
    use serde::{Deserialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Multiline {
        One(String),
        Lines(Vec<String>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Option::<Multiline>::deserialize(deserializer) {
            Ok(Some(Multiline::One(s))) => Ok(s),
            Ok(Some(Multiline::Lines(lines))) => Ok(lines.concat()),
            Ok(None) => Ok(String::new()),
            Err(e) => Err(D::Error::custom(format!("expected string or list of lines: {e}"))),
        }
    }

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(value.split_inclusive('\n'))
    }
}
