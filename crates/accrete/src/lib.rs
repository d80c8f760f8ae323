//! Additive schema evolution for Postgres tables.
//!
//! Records arriving at a write endpoint may carry fields the table has never
//! seen. Instead of rejecting them or requiring a migration, `accrete` reads
//! the table's live column set, infers a column type for every unseen field
//! from its value, and adds the missing columns one `ALTER TABLE` at a time.
//!
//! It only ever adds columns: nothing is dropped, renamed or retyped.
//!
//! # Usage
//!
//! ```ignore
//! use accrete::{EvolverConfig, Record, SchemaEvolver};
//!
//! let evolver = SchemaEvolver::new(&client, EvolverConfig::default());
//!
//! let mut record = Record::new();
//! record.insert("first_name".into(), "Ann".into());
//! record.insert("blood_group".into(), "O+".into());
//! record.insert("id".into(), 4.into());
//!
//! let report = evolver.synchronize("students", &record).await?;
//! // `first_name` and `id` already exist, so only `blood_group` is reported
//! assert_eq!(report.get("blood_group"), Some(true));
//!
//! // Write only what has a column to go to
//! report.retain_persistable(&mut record);
//! ```
//!
//! # Connections
//!
//! Everything runs on a connection the caller owns, passed by reference; see
//! [`Connection`]. It is implemented for `tokio_postgres::Client` and
//! `deadpool_postgres::Object`.
//!
//! # Logging
//!
//! Events go through `tracing`: `info` for added columns, `warn` for skipped
//! fields, `error` for failed DDL. SQL is logged in `debug` spans.

mod config;
mod conn;
mod error;
mod evolve;
pub mod ident;
mod infer;
mod inspect;
mod report;
mod value;

pub use config::{
    DEFAULT_PROTECTED_FIELDS, DEFAULT_SCHEMA, DEFAULT_STANDARD_COLUMNS, EvolverConfig,
    ProtectedFields,
};
pub use conn::{BoxFuture, Connection, TABLE_COLUMNS_SQL};
pub use error::{ConfigError, Error, IntrospectionCause, SqlError};
pub use evolve::{SchemaEvolver, add_column_sql};
pub use infer::{ColumnSpec, ColumnType, SHORT_TEXT_MAX, infer_type};
pub use inspect::SchemaInspector;
pub use report::{FieldOutcome, SyncReport};
pub use value::{Record, Value};

// Re-exported so connection implementors can build `SqlError`s.
pub use tokio_postgres::error::SqlState;

/// Result type for accrete operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Synchronize `table` with `record` using the default configuration.
///
/// Shorthand for `SchemaEvolver::new(conn, EvolverConfig::default()).synchronize(..)`.
pub async fn auto_evolve<C: Connection>(
    conn: &C,
    table: &str,
    record: &Record,
) -> Result<SyncReport> {
    SchemaEvolver::new(conn, EvolverConfig::default())
        .synchronize(table, record)
        .await
}
