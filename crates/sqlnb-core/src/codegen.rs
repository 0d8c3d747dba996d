/*
 * codegen.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Executable code generation for SQL cells.
 */

//! Executable code generation for SQL cells.
//!
//! A SQL cell becomes a Python cell that opens (once per kernel) a SQLAlchemy
//! engine, sets the session locale and date format, runs the statement and
//! renders the resulting data frame as an HTML table.
//!
//! Generation is table-driven: the cell's tags pick a [`QueryVariant`], the
//! variant picks a code template, and `${name}` markers in the template are
//! filled in a single pass. Every substituted value is validated or escaped
//! before it reaches the template.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::Result;
use crate::config::SessionSettings;
use crate::error::CellLocation;
use crate::tags::{self, DateFormat, TagSet};

const PRELUDE: &str = "\
import pandas as pd
from sqlalchemy import create_engine, text
from sqlalchemy.exc import DatabaseError
if 'engine' not in globals():
    engine = create_engine('${uri}')

";

const SESSION: &str = "\
with engine.connect() as conn:
    conn.execute(text(\"ALTER SESSION SET NLS_TERRITORY = ${territory}\"))
    conn.execute(text(\"ALTER SESSION SET NLS_LANGUAGE = ${language}\"))
    conn.execute(text(\"ALTER SESSION SET NLS_DATE_FORMAT = '${nls_format}'\"))
";

const TABLE_QUERY: &str = r#"    df = pd.read_sql(sql="""${source}""", con=conn)
    for x in df.select_dtypes(include=['datetime64']).columns.tolist():
        df[x] = df[x].dt.strftime('${strftime}')
    for x in df.select_dtypes(include=['float64']).columns.tolist():
        df[x] = df[x].apply(lambda v: '{:.9g}'.format(v))
    df.fillna("(null)", inplace=True)
    df = df.replace("nan", "(null)")
    df.index += 1
${result}
"#;

const CAPTURED_QUERY: &str = r#"    try:
        df = pd.read_sql(sql="""${source}""", con=conn)
        for x in df.select_dtypes(include=['datetime64']).columns.tolist():
            df[x] = df[x].dt.strftime('${strftime}')
        for x in df.select_dtypes(include=['float64']).columns.tolist():
            df[x] = df[x].apply(lambda v: '{:.9g}'.format(v))
        df.fillna("(null)", inplace=True)
        df = df.replace("nan", "(null)")
        df.index += 1
    except Exception as e:
        print(_sqlnb_error_message(e))
"#;

/// Best-effort readable message from a driver error.
const ERROR_MESSAGE_HELPER: &str = "\
def _sqlnb_error_message(e):
    orig = getattr(e, 'orig', None)
    args = getattr(orig, 'args', None) or ()
    if args:
        return getattr(args[0], 'message', str(args[0]))
    return str(e)

";

const NO_RESULT_QUERY: &str = r#"    conn.execute(text("""${source}"""))
    conn.commit()
"#;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-z_]+)\}").expect("marker pattern is valid")
});

/// How a SQL cell's result is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryVariant {
    /// Run the query and show its rows, optionally only the first `limit`.
    Table { limit: Option<u64> },
    /// Run and commit a statement with nothing to show (`noresult`).
    NoResult,
    /// Run the query, printing the driver's message on failure (`except`).
    CaptureErrors,
}

/// Everything needed to generate one cell body, validated up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub variant: QueryVariant,
    pub date_format: DateFormat,
    /// The statement with its terminator stripped.
    pub statement: String,
}

impl QueryPlan {
    /// Build the plan for one finalized SQL cell.
    ///
    /// `dateformat:` and `limit:` tags are validated for every variant, so a
    /// bad tag is reported even where it would have no effect.
    pub fn from_cell(
        source: &str,
        cell_tags: &TagSet,
        location: impl Fn() -> CellLocation,
    ) -> Result<Self> {
        let date_format = tags::date_format(cell_tags, &location)?;
        let limit = tags::row_limit(cell_tags, &location)?;

        let variant = if cell_tags.contains(tags::NO_RESULT) {
            QueryVariant::NoResult
        } else if cell_tags.contains(tags::EXCEPT) {
            QueryVariant::CaptureErrors
        } else {
            QueryVariant::Table { limit }
        };

        Ok(Self {
            variant,
            date_format,
            statement: strip_terminator(source, cell_tags.contains(tags::PLSQL)),
        })
    }
}

/// Strip trailing `;` (SQL) or a trailing `/` line (PL/SQL).
pub fn strip_terminator(source: &str, plsql: bool) -> String {
    let trimmed = source.trim_end();
    if plsql {
        trimmed.trim_end_matches('/').trim_end().to_string()
    } else {
        trimmed.trim_end_matches(';').to_string()
    }
}

/// Turns query plans into executable cell bodies.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    connection_uri: String,
    session: SessionSettings,
}

impl CodeGenerator {
    pub fn new(connection_uri: impl Into<String>, session: SessionSettings) -> Self {
        Self {
            connection_uri: connection_uri.into(),
            session,
        }
    }

    pub fn generate(&self, plan: &QueryPlan) -> String {
        let (helper, body) = match plan.variant {
            QueryVariant::Table { .. } => ("", TABLE_QUERY),
            QueryVariant::NoResult => ("", NO_RESULT_QUERY),
            QueryVariant::CaptureErrors => (ERROR_MESSAGE_HELPER, CAPTURED_QUERY),
        };

        let result = match plan.variant {
            QueryVariant::Table { limit: Some(n) } => format!("df.head({n}).to_html()"),
            _ => "df.to_html()".to_string(),
        };

        let mut values: HashMap<&str, String> = HashMap::new();
        values.insert("uri", escape_single_quoted(&self.connection_uri));
        values.insert("territory", self.session.territory.clone());
        values.insert("language", self.session.language.clone());
        values.insert("nls_format", plan.date_format.nls_format().to_string());
        values.insert("strftime", plan.date_format.strftime().to_string());
        values.insert("source", escape_triple_quoted(&plan.statement));
        values.insert("result", result);

        let template = format!("{PRELUDE}{helper}{SESSION}{body}");
        substitute(&template, &values)
    }
}

/// Replace `${name}` markers in one pass; substituted text is never rescanned.
fn substitute(template: &str, values: &HashMap<&str, String>) -> String {
    MARKER
        .replace_all(template, |caps: &Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}

fn escape_triple_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_single_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
