//! Additive schema evolution.
//!
//! [`SchemaEvolver::synchronize`] compares the fields of one record against the
//! live column set of a table and adds a column for every field the table does
//! not have yet. Each `ADD COLUMN` is its own transaction, so one failing field
//! never blocks the others, and the outcome of every attempted field lands in
//! the returned [`SyncReport`].
//!
//! ## Races
//!
//! The column set is re-read on every call and no lock is taken. Two writers
//! that see the same new field at the same time both issue `ADD COLUMN`; the
//! loser gets `duplicate_column` (SQLSTATE `42701`), which is reported as
//! [`FieldOutcome::AlreadyExists`] and counts as success.
//!
//! ## Example
//!
//! ```ignore
//! let evolver = SchemaEvolver::new(&client, EvolverConfig::default());
//!
//! let mut record = Record::new();
//! record.insert("first_name".into(), "Ann".into());
//! record.insert("blood_group".into(), "O+".into());
//!
//! let report = evolver.synchronize("students", &record).await?;
//! assert_eq!(report.get("blood_group"), Some(true));
//! ```

use crate::config::EvolverConfig;
use crate::conn::Connection;
use crate::infer::{ColumnSpec, infer_type};
use crate::inspect::SchemaInspector;
use crate::report::{FieldOutcome, SyncReport};
use crate::value::Record;
use crate::{Result, ident};
use std::collections::{HashMap, HashSet};

/// Render the `ALTER TABLE` statement that adds one column.
///
/// Identifiers are emitted as given; callers validate and fold them first.
pub fn add_column_sql(schema: &str, table: &str, column: &str, spec: &ColumnSpec) -> String {
    format!("ALTER TABLE {}.{} ADD COLUMN {} {}", schema, table, column, spec)
}

/// How one record field relates to the table's current columns.
enum Candidate {
    Present,
    Protected,
    InvalidName,
    New(String),
}

/// Brings a table's columns in line with the fields of incoming records.
pub struct SchemaEvolver<'c, C: Connection> {
    inspector: SchemaInspector<'c, C>,
    config: EvolverConfig,
}

impl<'c, C: Connection> SchemaEvolver<'c, C> {
    pub fn new(conn: &'c C, config: EvolverConfig) -> Self {
        let inspector = SchemaInspector::new(conn).with_schema(config.schema());
        Self { inspector, config }
    }

    pub fn config(&self) -> &EvolverConfig {
        &self.config
    }

    pub fn inspector(&self) -> &SchemaInspector<'c, C> {
        &self.inspector
    }

    /// Add a column for every field of `record` that `table` does not have.
    ///
    /// Fields already present are left out of the report. Protected fields,
    /// invalid names and case-fold collisions are reported as `false` without
    /// touching the database.
    ///
    /// # Errors
    ///
    /// Only if the column set cannot be read, in which case no DDL is issued.
    pub async fn synchronize(&self, table: &str, record: &Record) -> Result<SyncReport> {
        let existing = self.inspector.columns_of(table).await?;
        let columns: HashSet<&str> = existing.iter().map(String::as_str).collect();
        let table_ident = ident::fold(table);

        // Two new fields must not land on the same column after folding.
        let mut claims: HashMap<String, usize> = HashMap::new();
        for field in record.keys() {
            if let Candidate::New(column) = self.classify(field, &columns) {
                *claims.entry(column).or_default() += 1;
            }
        }

        let mut report = SyncReport::new();
        for (field, value) in record {
            let column = match self.classify(field, &columns) {
                Candidate::Present => continue,
                Candidate::Protected => {
                    tracing::warn!(table = %table_ident, field = %field, "skipping protected field");
                    report.record(field.as_str(), FieldOutcome::Protected);
                    continue;
                }
                Candidate::InvalidName => {
                    tracing::warn!(
                        table = %table_ident,
                        field = %field,
                        "skipping field with invalid column name"
                    );
                    report.record(field.as_str(), FieldOutcome::InvalidName);
                    continue;
                }
                Candidate::New(column) => column,
            };

            if claims.get(&column).copied().unwrap_or(0) > 1 {
                tracing::warn!(
                    table = %table_ident,
                    field = %field,
                    column = %column,
                    "skipping field whose column name collides with another field"
                );
                report.record(field.as_str(), FieldOutcome::NameCollision { column });
                continue;
            }

            let spec = infer_type(value);
            let outcome = self.apply_column(&table_ident, &column, &spec).await;
            report.record(field.as_str(), outcome);
        }

        Ok(report)
    }

    /// Add one column, committing immediately.
    ///
    /// Returns `true` if the column exists afterwards, including when a
    /// concurrent writer created it first. Failures are logged and rolled
    /// back, never propagated. The protected list is not consulted here.
    pub async fn add_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> bool {
        let (Some(table_ident), Some(column_ident)) =
            (ident::normalize(table), ident::normalize(column))
        else {
            tracing::warn!(
                table = %table,
                column = %column,
                "refusing to add column: invalid identifier"
            );
            return false;
        };
        self.apply_column(&table_ident, &column_ident, spec)
            .await
            .is_column()
    }

    /// Columns of `table` that are not part of the configured standard set,
    /// i.e. the ones added on top of the base model.
    pub async fn custom_columns(&self, table: &str) -> Result<Vec<String>> {
        let columns = self.inspector.columns_of(table).await?;
        Ok(columns
            .into_iter()
            .filter(|c| !self.config.is_standard_column(c))
            .collect())
    }

    fn classify(&self, field: &str, columns: &HashSet<&str>) -> Candidate {
        let folded = ident::fold(field);
        if columns.contains(field) || columns.contains(folded.as_str()) {
            Candidate::Present
        } else if self.config.protected_fields().contains(field) {
            Candidate::Protected
        } else if ident::is_valid(field) {
            Candidate::New(folded)
        } else {
            Candidate::InvalidName
        }
    }

    async fn apply_column(&self, table: &str, column: &str, spec: &ColumnSpec) -> FieldOutcome {
        let Some(schema) = ident::normalize(self.config.schema()) else {
            tracing::error!(schema = %self.config.schema(), "invalid schema name");
            return FieldOutcome::InvalidName;
        };
        let sql = add_column_sql(&schema, table, column, spec);

        let result = self
            .inspector
            .connection()
            .execute_ddl(&sql, self.config.statement_timeout())
            .await;

        match result {
            Ok(()) => {
                tracing::info!(
                    table = %table,
                    column = %column,
                    column_type = %spec.column_type,
                    "added column"
                );
                FieldOutcome::Added {
                    column: column.to_string(),
                    column_type: spec.column_type,
                }
            }
            Err(err) if err.is_duplicate_column() => {
                tracing::info!(
                    table = %table,
                    column = %column,
                    "column was added concurrently"
                );
                FieldOutcome::AlreadyExists {
                    column: column.to_string(),
                }
            }
            Err(err) => {
                tracing::error!(
                    table = %table,
                    column = %column,
                    column_type = %spec.column_type,
                    sqlstate = err.code().map(|c| c.code()),
                    error = %err,
                    "failed to add column"
                );
                FieldOutcome::Failed {
                    column: column.to_string(),
                    column_type: spec.column_type,
                    error: err,
                }
            }
        }
    }
}
