/*
 * tags.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cell tag vocabulary and tag-value parsing.
 */

//! Cell tag vocabulary.
//!
//! Tags are the only channel between stages. Authors write the declarative
//! tags in their notebook; the pipeline adds and removes the derived ones
//! (`sql_source`, `sql_execute`, `sql_executed`, `sql_result`).
//!
//! A SQL cell moves through `sql_execute -> sql_executed -> sql_result`
//! and carries at most one of those three at a time.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::error::{CellLocation, SqlnbError};

// Declarative tags
pub const SQL: &str = "sql";
pub const PLSQL: &str = "plsql";
pub const HIDE_INPUT: &str = "hideinput";
pub const IGNORE: &str = "ignore";
pub const NO_RESULT: &str = "noresult";
pub const EXCEPT: &str = "except";
pub const CORRECTION: &str = "correction";
pub const ORACLE: &str = "oracle";
pub const LIMIT_PREFIX: &str = "limit";
pub const DATE_FORMAT_PREFIX: &str = "dateformat";

pub const ENUM_START: &str = "enum:start";
pub const ENUM_CONT: &str = "enum:cont";
pub const ENUM_END: &str = "enum:end";
pub const ITEM_START: &str = "item:start";
pub const ITEM_CONT: &str = "item:cont";
pub const ITEM_END: &str = "item:end";

// Derived tags
pub const SQL_SOURCE: &str = "sql_source";
pub const SQL_EXECUTE: &str = "sql_execute";
pub const SQL_EXECUTED: &str = "sql_executed";
pub const SQL_RESULT: &str = "sql_result";

/// An ordered set of cell tags.
///
/// Membership has set semantics, but the order tags were written in is kept
/// so that notebooks round-trip. Operations return a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagSet(Vec<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// A copy of this set with `tag` appended (no-op if already present).
    pub fn with(&self, tag: &str) -> Self {
        let mut tags = self.clone();
        if !tags.contains(tag) {
            tags.0.push(tag.to_string());
        }
        tags
    }

    /// A copy of this set with `tag` removed.
    pub fn without(&self, tag: &str) -> Self {
        Self(self.0.iter().filter(|t| *t != tag).cloned().collect())
    }

    /// Remove `from` and append `to`.
    pub fn retag(&self, from: &str, to: &str) -> Self {
        self.without(from).with(to)
    }

    /// Value of the first `prefix:<value>` tag, if any.
    ///
    /// Everything after the first `:` is the value, so
    /// `dateformat:DD/MM/RR` yields `DD/MM/RR`.
    pub fn value_of(&self, prefix: &str) -> Option<&str> {
        self.0.iter().find_map(|t| {
            t.split_once(':')
                .filter(|(p, _)| *p == prefix)
                .map(|(_, value)| value)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl From<Vec<String>> for TagSet {
    fn from(tags: Vec<String>) -> Self {
        let mut set = Vec::with_capacity(tags.len());
        for tag in tags {
            if !set.contains(&tag) {
                set.push(tag);
            }
        }
        Self(set)
    }
}

impl From<TagSet> for Vec<String> {
    fn from(tags: TagSet) -> Self {
        tags.0
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<String>>())
    }
}

/// Session date formats understood by `dateformat:<NAME>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFormat {
    /// `DD/MM/YYYY`
    DayMonthYear,
    /// `YYYY-MM-DD`
    #[default]
    Iso,
    /// `DD/MM/RR`
    DayMonthShortYear,
}

impl DateFormat {
    pub const ALL: [DateFormat; 3] = [
        DateFormat::DayMonthYear,
        DateFormat::Iso,
        DateFormat::DayMonthShortYear,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.nls_format() == name)
    }

    /// The database session format (`NLS_DATE_FORMAT`).
    pub fn nls_format(self) -> &'static str {
        match self {
            DateFormat::DayMonthYear => "DD/MM/YYYY",
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::DayMonthShortYear => "DD/MM/RR",
        }
    }

    /// The equivalent `strftime` pattern used to restringify datetime columns.
    pub fn strftime(self) -> &'static str {
        match self {
            DateFormat::DayMonthYear => "%d/%m/%Y",
            DateFormat::Iso => "%Y-%m-%d",
            DateFormat::DayMonthShortYear => "%d/%m/%y",
        }
    }
}

/// Resolve the `dateformat:<NAME>` tag, defaulting to `YYYY-MM-DD`.
pub fn date_format(tags: &TagSet, location: impl FnOnce() -> CellLocation) -> Result<DateFormat> {
    let Some(name) = tags.value_of(DATE_FORMAT_PREFIX) else {
        return Ok(DateFormat::default());
    };
    DateFormat::parse(name).ok_or_else(|| {
        let known: Vec<&str> = DateFormat::ALL.iter().map(|f| f.nls_format()).collect();
        SqlnbError::configuration(
            location(),
            format!(
                "unknown date format '{name}' (expected one of {})",
                known.join(", ")
            ),
        )
    })
}

/// Resolve the `limit:<N>` tag.
pub fn row_limit(tags: &TagSet, location: impl FnOnce() -> CellLocation) -> Result<Option<u64>> {
    let Some(value) = tags.value_of(LIMIT_PREFIX) else {
        return Ok(None);
    };
    value.trim().parse::<u64>().map(Some).map_err(|_| {
        SqlnbError::configuration(
            location(),
            format!("malformed row limit 'limit:{value}' (expected a non-negative integer)"),
        )
    })
}

/// Where a SQL cell is in its derived-tag lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlCellState {
    /// No derived lifecycle tag.
    Untouched,
    Execute,
    Executed,
    Result,
}

impl SqlCellState {
    /// Read the lifecycle state, rejecting cells carrying more than one
    /// lifecycle tag.
    pub fn of(tags: &TagSet, location: impl FnOnce() -> CellLocation) -> Result<Self> {
        let present: Vec<&str> = [SQL_EXECUTE, SQL_EXECUTED, SQL_RESULT]
            .into_iter()
            .filter(|t| tags.contains(t))
            .collect();
        match present.as_slice() {
            [] => Ok(SqlCellState::Untouched),
            [SQL_EXECUTE] => Ok(SqlCellState::Execute),
            [SQL_EXECUTED] => Ok(SqlCellState::Executed),
            [SQL_RESULT] => Ok(SqlCellState::Result),
            _ => Err(SqlnbError::invariant(
                location(),
                format!("conflicting lifecycle tags: {}", present.join(", ")),
            )),
        }
    }
}
