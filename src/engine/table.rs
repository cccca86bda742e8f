//! Typed relations exchanged with the query engine.

use chrono::NaiveDateTime;
use std::fmt;

/// Column types used for raw tables and reference tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bigint,
    Double,
    Varchar,
    Timestamp,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlType::Bigint => "BIGINT",
            SqlType::Double => "DOUBLE",
            SqlType::Varchar => "VARCHAR",
            SqlType::Timestamp => "TIMESTAMP",
        })
    }
}

/// A single cell. Anything that fails to parse as its column type is `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses the timestamp spellings found in the taxi exports.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Parses an integer, accepting whole-valued floats such as `"1.0"`.
/// Values outside the `i64` range are rejected rather than clamped.
pub fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let f = raw.parse::<f64>().ok()?;
    // 2^63 is exact as an f64; anything at or above it does not fit.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl SqlValue {
    pub fn parse(ty: SqlType, raw: &str) -> SqlValue {
        let parsed = match ty {
            SqlType::Bigint => parse_int(raw).map(SqlValue::Int),
            SqlType::Double => parse_float(raw).map(SqlValue::Float),
            SqlType::Timestamp => parse_timestamp(raw).map(SqlValue::Timestamp),
            SqlType::Varchar => {
                let trimmed = raw.trim();
                (!trimmed.is_empty()).then(|| SqlValue::Text(trimmed.to_string()))
            }
        };
        parsed.unwrap_or(SqlValue::Null)
    }

    /// Renders the value as a SQL literal.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => format!("{v:?}"),
            SqlValue::Text(s) => quote_literal(s),
            SqlValue::Timestamp(ts) => {
                format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.3f"))
            }
        }
    }
}

pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A named relation to be bulk-loaded with full-replace semantics.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<SqlValue>>,
}

/// Result of a read query: column names plus JSON-typed cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl RowSet {
    /// First cell of the first row, the usual shape of a scalar query.
    pub fn scalar(&self) -> Option<&serde_json::Value> {
        self.rows.first().and_then(|r| r.first())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }
}
