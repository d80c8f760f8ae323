//! In-memory `Connection` that records every statement it is asked to run.

#![allow(dead_code)]

use accrete::{BoxFuture, Connection, Record, SqlError, SqlState, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct MemoryConnection {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    /// `schema.table` -> visible columns
    tables: HashMap<String, Vec<String>>,
    /// Columns another writer added after our catalog read.
    behind_catalog: HashMap<String, Vec<String>>,
    failing: HashMap<String, SqlError>,
    catalog_error: Option<SqlError>,
    ddl: Vec<String>,
    timeouts: Vec<Option<Duration>>,
    catalog_reads: usize,
}

fn key(schema: &str, table: &str) -> String {
    format!("{}.{}", schema, table)
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table in the `public` schema.
    pub fn with_table(self, table: &str, columns: &[&str]) -> Self {
        self.with_schema_table("public", table, columns)
    }

    pub fn with_schema_table(self, schema: &str, table: &str, columns: &[&str]) -> Self {
        self.state.lock().unwrap().tables.insert(
            key(schema, table),
            columns.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    /// Make `ADD COLUMN <column>` fail with the given error.
    pub fn failing_column(self, column: &str, error: SqlError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(column.to_string(), error);
        self
    }

    /// Make every catalog read fail.
    pub fn failing_catalog(self, error: SqlError) -> Self {
        self.state.lock().unwrap().catalog_error = Some(error);
        self
    }

    /// Simulate a concurrent writer that added `column` to `public.table`
    /// right after our catalog read: the catalog does not report it, but
    /// `ADD COLUMN` collides with it.
    pub fn add_column_behind_catalog(&self, table: &str, column: &str) {
        self.state
            .lock()
            .unwrap()
            .behind_catalog
            .entry(key("public", table))
            .or_default()
            .push(column.to_string());
    }

    /// Simulate DDL from another process that commits before our next
    /// catalog read.
    pub fn add_column_externally(&self, table: &str, column: &str) {
        self.state
            .lock()
            .unwrap()
            .tables
            .entry(key("public", table))
            .or_default()
            .push(column.to_string());
    }

    pub fn columns(&self, table: &str) -> Vec<String> {
        self.state.lock().unwrap().tables[&key("public", table)].clone()
    }

    pub fn ddl(&self) -> Vec<String> {
        self.state.lock().unwrap().ddl.clone()
    }

    pub fn timeouts(&self) -> Vec<Option<Duration>> {
        self.state.lock().unwrap().timeouts.clone()
    }

    pub fn catalog_reads(&self) -> usize {
        self.state.lock().unwrap().catalog_reads
    }
}

impl Connection for MemoryConnection {
    fn table_columns<'a>(
        &'a self,
        schema: &'a str,
        table: &'a str,
    ) -> BoxFuture<'a, Result<Option<Vec<String>>, SqlError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.catalog_reads += 1;
            if let Some(err) = &state.catalog_error {
                return Err(err.clone());
            }
            Ok(state.tables.get(&key(schema, table)).cloned())
        })
    }

    fn execute_ddl<'a>(
        &'a self,
        sql: &'a str,
        timeout: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), SqlError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.ddl.push(sql.to_string());
            state.timeouts.push(timeout);

            // ALTER TABLE <schema.table> ADD COLUMN <column> <type...>
            let tokens: Vec<&str> = sql.split_whitespace().collect();
            let (relation, column) = (tokens[2], tokens[5]);

            if let Some(err) = state.failing.get(column) {
                return Err(err.clone());
            }
            if !state.tables.contains_key(relation) {
                return Err(SqlError::new(
                    Some(SqlState::UNDEFINED_TABLE),
                    format!("relation \"{}\" does not exist", relation),
                ));
            }

            let hidden = state
                .behind_catalog
                .get(relation)
                .is_some_and(|cols| cols.iter().any(|c| c == column));
            let visible = state.tables[relation].iter().any(|c| c == column);
            if hidden || visible {
                if hidden {
                    state.tables.get_mut(relation).unwrap().push(column.to_string());
                    state.behind_catalog.get_mut(relation).unwrap().retain(|c| c != column);
                }
                return Err(SqlError::new(
                    Some(SqlState::DUPLICATE_COLUMN),
                    format!("column \"{}\" of relation \"{}\" already exists", column, relation),
                ));
            }

            state.tables.get_mut(relation).unwrap().push(column.to_string());
            Ok(())
        })
    }
}

pub fn syntax_error(near: &str) -> SqlError {
    SqlError::new(
        Some(SqlState::SYNTAX_ERROR),
        format!("syntax error at or near \"{}\"", near),
    )
}

pub fn record<const N: usize>(fields: [(&str, Value); N]) -> Record {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
