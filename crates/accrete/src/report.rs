//! Per-call synchronization outcomes.

use crate::error::SqlError;
use crate::infer::ColumnType;
use crate::value::Record;
use indexmap::IndexMap;
use std::fmt;

/// What happened to one field that was not already a column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// The column was created by this call.
    Added { column: String, column_type: ColumnType },
    /// `ADD COLUMN` hit a duplicate column: another writer created it first.
    AlreadyExists { column: String },
    /// The field is on the protected list; no DDL was attempted.
    Protected,
    /// The field name is not a usable identifier; no DDL was attempted.
    InvalidName,
    /// The field folds to the same column name as another new field in the
    /// same record; none of the colliding fields were added.
    NameCollision { column: String },
    /// The DDL statement failed and was rolled back.
    Failed {
        column: String,
        column_type: ColumnType,
        error: SqlError,
    },
}

impl FieldOutcome {
    /// Whether the field ended up backed by a real column.
    pub fn is_column(&self) -> bool {
        matches!(
            self,
            FieldOutcome::Added { .. } | FieldOutcome::AlreadyExists { .. }
        )
    }
}

impl fmt::Display for FieldOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldOutcome::Added {
                column,
                column_type,
            } => write!(f, "added {} {}", column, column_type),
            FieldOutcome::AlreadyExists { column } => {
                write!(f, "{} already added concurrently", column)
            }
            FieldOutcome::Protected => write!(f, "protected"),
            FieldOutcome::InvalidName => write!(f, "invalid identifier"),
            FieldOutcome::NameCollision { column } => {
                write!(f, "collides with another field as {}", column)
            }
            FieldOutcome::Failed {
                column,
                column_type,
                error,
            } => write!(f, "failed to add {} {}: {}", column, column_type, error),
        }
    }
}

/// Outcome of one [`synchronize`](crate::SchemaEvolver::synchronize) call.
///
/// Only fields that needed a column appear: fields that already existed are
/// absent, so an empty report means nothing had to change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    outcomes: IndexMap<String, FieldOutcome>,
}

impl SyncReport {
    /// An empty report: nothing needed a column.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, field: impl Into<String>, outcome: FieldOutcome) {
        self.outcomes.insert(field.into(), outcome);
    }

    /// `Some(true)` if the field now has a column, `Some(false)` if it was
    /// rejected or failed, `None` if it did not need one.
    pub fn get(&self, field: &str) -> Option<bool> {
        self.outcomes.get(field).map(FieldOutcome::is_column)
    }

    /// The detailed outcome for `field`, when it needed a column.
    pub fn outcome(&self, field: &str) -> Option<&FieldOutcome> {
        self.outcomes.get(field)
    }

    /// Field names with their boolean outcome, in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.outcomes
            .iter()
            .map(|(field, outcome)| (field.as_str(), outcome.is_column()))
    }

    /// Field names with their detailed outcome, in record order.
    pub fn outcomes(&self) -> impl Iterator<Item = (&str, &FieldOutcome)> {
        self.outcomes.iter().map(|(field, outcome)| (field.as_str(), outcome))
    }

    /// The field-to-boolean view of this report.
    pub fn to_map(&self) -> IndexMap<String, bool> {
        self.iter().map(|(f, ok)| (f.to_string(), ok)).collect()
    }

    /// Fields that now have a column.
    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, ok)| *ok).map(|(f, _)| f)
    }

    /// Fields left without a column.
    pub fn rejected(&self) -> impl Iterator<Item = &str> {
        self.iter().filter(|(_, ok)| !*ok).map(|(f, _)| f)
    }

    pub fn has_rejections(&self) -> bool {
        self.rejected().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Drop the fields this report rejected, leaving only fields that have a
    /// column to write to.
    pub fn retain_persistable(&self, record: &mut Record) {
        record.retain(|field, _| self.get(field) != Some(false));
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, outcome) in &self.outcomes {
            let sign = if outcome.is_column() { '+' } else { '!' };
            writeln!(f, "{} {}: {}", sign, field, outcome)?;
        }
        Ok(())
    }
}
