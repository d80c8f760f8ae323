//! Database connection seam.
//!
//! Implemented for `tokio_postgres::Client` and `deadpool_postgres::Object`.
//! Every catalog query and DDL statement runs inside a `tracing::debug_span!`,
//! so enabling `accrete=debug` logs the SQL sent to the server.

use crate::error::SqlError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio_postgres::Client;
use tracing::Instrument;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Column names of a relation, in ordinal order.
///
/// The `LEFT JOIN` yields one row with a NULL name for a relation that exists
/// but has no columns, and no rows at all for a missing relation.
pub const TABLE_COLUMNS_SQL: &str = "SELECT a.attname::text \
     FROM pg_catalog.pg_class c \
     JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
     LEFT JOIN pg_catalog.pg_attribute a \
       ON a.attrelid = c.oid AND a.attnum > 0 AND NOT a.attisdropped \
     WHERE n.nspname::text = $1 AND c.relname::text = $2 \
       AND c.relkind IN ('r', 'p', 'v', 'm', 'f') \
     ORDER BY a.attnum";

/// What the inspector and evolver need from a live database session.
///
/// The caller owns the session; nothing in this crate opens or pools
/// connections.
pub trait Connection: Send + Sync {
    /// Read the current columns of `schema.table` from the catalog.
    ///
    /// Returns `None` if no such relation exists.
    fn table_columns<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<String>>, SqlError>>;

    /// Run one DDL statement as its own transaction, rolling back on failure.
    ///
    /// `timeout` overrides the session's statement timeout for this
    /// statement only.
    fn execute_ddl<'a>(
        &'a self,
        sql: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), SqlError>>;
}

impl Connection for Client {
    fn table_columns<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<String>>, SqlError>> {
        Box::pin(query_table_columns(self, schema, table))
    }

    fn execute_ddl<'a>(
        &'a self,
        sql: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), SqlError>> {
        Box::pin(run_ddl(self, sql, timeout))
    }
}

impl Connection for deadpool_postgres::Object {
    fn table_columns<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<String>>, SqlError>> {
        let client: &Client = self;
        Box::pin(query_table_columns(client, schema, table))
    }

    fn execute_ddl<'a>(
        &'a self,
        sql: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), SqlError>> {
        let client: &Client = self;
        Box::pin(run_ddl(client, sql, timeout))
    }
}

async fn query_table_columns(
    client: &Client,
    schema: &str,
    table: &str,
) -> Result<Option<Vec<String>>, SqlError> {
    let span = tracing::debug_span!(
        "db.query",
        sql = TABLE_COLUMNS_SQL,
        schema = %schema,
        table = %table,
        rows = tracing::field::Empty,
    );
    let rows = client
        .query(TABLE_COLUMNS_SQL, &[&schema, &table])
        .instrument(span.clone())
        .await?;
    span.record("rows", rows.len());

    if rows.is_empty() {
        return Ok(None);
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(name) = row.try_get::<_, Option<String>>(0)? {
            columns.push(name);
        }
    }
    Ok(Some(columns))
}

async fn run_ddl(client: &Client, sql: &str, timeout: Option<Duration>) -> Result<(), SqlError> {
    let batch = ddl_batch(sql, timeout);
    let span = tracing::debug_span!(
        "db.execute",
        sql = %batch,
        timeout_ms = timeout.map(timeout_millis),
    );
    client.batch_execute(&batch).instrument(span).await?;
    Ok(())
}

/// Build the simple-query text for one DDL statement.
///
/// A multi-statement simple query runs as a single implicit transaction that
/// the server commits or rolls back by itself, so the unit of work can never
/// be left open on the connection, even when the caller drops the future
/// after the message went out. `SET LOCAL` is scoped to that transaction.
fn ddl_batch(sql: &str, timeout: Option<Duration>) -> String {
    match timeout {
        Some(timeout) => format!(
            "SET LOCAL statement_timeout = {}; {}",
            timeout_millis(timeout),
            sql
        ),
        None => sql.to_string(),
    }
}

/// Whole milliseconds, rounded up and never 0, which Postgres reads as
/// "no timeout".
fn timeout_millis(timeout: Duration) -> u64 {
    let nanos = timeout.as_nanos().div_ceil(1_000_000);
    u64::try_from(nanos).unwrap_or(u64::MAX).max(1)
}
