use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to introspect columns of table `{table}`: {source}")]
    SchemaIntrospection {
        table: String,
        #[source]
        source: IntrospectionCause,
    },
}

impl Error {
    pub(crate) fn introspection(table: &str, source: impl Into<IntrospectionCause>) -> Self {
        Error::SchemaIntrospection {
            table: table.to_string(),
            source: source.into(),
        }
    }
}

/// Why a catalog read could not produce a column set.
#[derive(Debug, Error)]
pub enum IntrospectionCause {
    #[error("table does not exist")]
    TableNotFound,

    #[error("invalid identifier: {0:?}")]
    InvalidName(String),

    #[error(transparent)]
    Sql(#[from] SqlError),
}

/// A database error reduced to what callers act on: the SQLSTATE and the
/// server's message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SqlError {
    code: Option<SqlState>,
    message: String,
}

impl SqlError {
    /// Build an error by hand, e.g. from a connection that is not
    /// `tokio-postgres` or from a test double.
    pub fn new(code: Option<SqlState>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// SQLSTATE reported by the server, if the error came from the server at all.
    pub fn code(&self) -> Option<&SqlState> {
        self.code.as_ref()
    }

    /// The server's primary message, without SQLSTATE or position.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `42701`: the column exists already, typically added by a concurrent writer.
    pub fn is_duplicate_column(&self) -> bool {
        self.code.as_ref() == Some(&SqlState::DUPLICATE_COLUMN)
    }
}

impl From<tokio_postgres::Error> for SqlError {
    fn from(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => Self::new(Some(db.code().clone()), db.message()),
            None => Self::new(err.code().cloned(), err.to_string()),
        }
    }
}

/// Errors from reading [`EvolverConfig`](crate::EvolverConfig) out of the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not valid unicode")]
    NotUnicode { var: &'static str },

    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}
