//! Value-to-column-type inference.
//!
//! Inference runs once, from the first value seen for a field, so it leans
//! towards wide types: a column that is too wide wastes a little storage, one
//! that is too narrow rejects future writes.
//!
//! | value                  | column type        |
//! |------------------------|--------------------|
//! | null                   | `TEXT`             |
//! | bool                   | `BOOLEAN`          |
//! | int                    | `INTEGER`          |
//! | float                  | `DOUBLE PRECISION` |
//! | date                   | `DATE`             |
//! | datetime               | `TIMESTAMP`        |
//! | text, <= 255 chars     | `VARCHAR(255)`     |
//! | longer text, bytes     | `TEXT`             |
//!
//! Known limitations, kept on purpose:
//! - a column created from a null stays `TEXT` even if later values are narrower;
//! - integers always map to 4-byte `INTEGER`, large values included, so an
//!   out-of-range value fails at insert time rather than here.

use crate::Value;
use std::fmt;

/// Longest text, in characters, that still gets a bounded `VARCHAR` column.
pub const SHORT_TEXT_MAX: usize = 255;

/// Postgres column types the inference policy can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// BOOLEAN (1 byte)
    Boolean,
    /// INTEGER (4 bytes)
    Integer,
    /// DOUBLE PRECISION (8 bytes)
    DoublePrecision,
    /// DATE
    Date,
    /// TIMESTAMP (without time zone)
    Timestamp,
    /// VARCHAR(n)
    Varchar(u16),
    /// TEXT
    Text,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::DoublePrecision => write!(f, "DOUBLE PRECISION"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Varchar(n) => write!(f, "VARCHAR({})", n),
            ColumnType::Text => write!(f, "TEXT"),
        }
    }
}

/// Inferred type and nullability for one new column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnSpec {
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnSpec {
    /// A nullable column of the given type.
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            nullable: true,
        }
    }

    /// Request `NOT NULL`. Adding such a column to a table that already has
    /// rows fails, since no default is supplied.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let null = if self.nullable { "NULL" } else { "NOT NULL" };
        write!(f, "{} {}", self.column_type, null)
    }
}

/// Infer the column spec for a field from one observed value.
pub fn infer_type(value: &Value) -> ColumnSpec {
    let column_type = match value {
        Value::Null => ColumnType::Text,
        Value::Bool(_) => ColumnType::Boolean,
        Value::Int(_) => ColumnType::Integer,
        Value::Float(_) => ColumnType::DoublePrecision,
        Value::Date(_) => ColumnType::Date,
        Value::DateTime(_) => ColumnType::Timestamp,
        Value::Text(s) if s.chars().count() <= SHORT_TEXT_MAX => {
            ColumnType::Varchar(SHORT_TEXT_MAX as u16)
        }
        Value::Text(_) | Value::Bytes(_) => ColumnType::Text,
    };
    ColumnSpec::new(column_type)
}
