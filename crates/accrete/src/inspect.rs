//! Live column introspection.

use crate::config::DEFAULT_SCHEMA;
use crate::conn::Connection;
use crate::error::{Error, IntrospectionCause};
use crate::{Result, ident};

/// Reads a table's current columns straight from the Postgres catalog.
///
/// Holds no state between calls: every call re-reads the catalog, so columns
/// added by other processes are visible immediately.
pub struct SchemaInspector<'c, C: Connection> {
    conn: &'c C,
    schema: String,
}

impl<'c, C: Connection> SchemaInspector<'c, C> {
    /// Inspect tables in the `public` schema.
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    /// Inspect tables in `schema` instead. Validated on each read, not here.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Schema this inspector reads from, as configured.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The borrowed connection, shared with the evolver for its DDL.
    pub fn connection(&self) -> &'c C {
        self.conn
    }

    /// Current column names of `table`, in ordinal order.
    ///
    /// `table` is resolved like an unquoted identifier, i.e. case-folded. A
    /// relation with no columns yields an empty vector.
    ///
    /// # Errors
    ///
    /// [`Error::SchemaIntrospection`] if the name is not a valid identifier,
    /// the table does not exist, or the catalog query fails.
    pub async fn columns_of(&self, table: &str) -> Result<Vec<String>> {
        let schema = ident::normalize(&self.schema).ok_or_else(|| {
            Error::introspection(table, IntrospectionCause::InvalidName(self.schema.clone()))
        })?;
        let relation = ident::normalize(table).ok_or_else(|| {
            Error::introspection(table, IntrospectionCause::InvalidName(table.to_string()))
        })?;

        match self.conn.table_columns(&schema, &relation).await {
            Ok(Some(columns)) => {
                tracing::trace!(table = %relation, columns = columns.len(), "read column set");
                Ok(columns)
            }
            Ok(None) => Err(Error::introspection(table, IntrospectionCause::TableNotFound)),
            Err(err) => {
                tracing::error!(table = %relation, error = %err, "catalog query failed");
                Err(Error::introspection(table, err))
            }
        }
    }
}
