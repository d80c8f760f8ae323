//! Evolver configuration.
//!
//! Built in code, or read from the environment with [`EvolverConfig::from_env`]:
//!
//! | variable                       | meaning                                  |
//! |--------------------------------|------------------------------------------|
//! | `ACCRETE_SCHEMA`               | schema holding the tables (`public`)     |
//! | `ACCRETE_PROTECTED_FIELDS`     | comma-separated names never auto-created |
//! | `ACCRETE_STANDARD_COLUMNS`     | comma-separated base-model columns       |
//! | `ACCRETE_STATEMENT_TIMEOUT_MS` | per-DDL statement timeout                |

use crate::error::ConfigError;
use crate::ident;
use std::collections::BTreeSet;
use std::env::VarError;
use std::num::NonZeroU64;
use std::time::Duration;

/// Identifiers, audit timestamps and credentials.
pub const DEFAULT_PROTECTED_FIELDS: &[&str] =
    &["id", "created_at", "updated_at", "hashed_password"];

/// Columns every base table carries; excluded from
/// [`SchemaEvolver::custom_columns`](crate::SchemaEvolver::custom_columns).
pub const DEFAULT_STANDARD_COLUMNS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "is_active",
    "school_id",
    "user_id",
];

pub const DEFAULT_SCHEMA: &str = "public";

/// Field names that must never become columns through evolution.
///
/// Names are stored and compared case-folded, so `ID` is as protected as `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedFields(BTreeSet<String>);

impl ProtectedFields {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(names.into_iter().map(|n| ident::fold(n.as_ref())).collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(&ident::fold(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ProtectedFields {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_FIELDS)
    }
}

/// Settings for a [`SchemaEvolver`](crate::SchemaEvolver), fixed once the
/// evolver is constructed.
#[derive(Debug, Clone)]
pub struct EvolverConfig {
    schema: String,
    protected_fields: ProtectedFields,
    standard_columns: BTreeSet<String>,
    statement_timeout: Option<Duration>,
}

impl Default for EvolverConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            protected_fields: ProtectedFields::default(),
            standard_columns: DEFAULT_STANDARD_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            statement_timeout: None,
        }
    }
}

impl EvolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Replace the protected set.
    pub fn with_protected_fields(mut self, fields: ProtectedFields) -> Self {
        self.protected_fields = fields;
        self
    }

    /// Replace the standard column set.
    pub fn with_standard_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.standard_columns = columns
            .into_iter()
            .map(|c| ident::fold(c.as_ref()))
            .collect();
        self
    }

    /// Bound each `ADD COLUMN` by `timeout`, applied with `SET LOCAL` so it
    /// never outlives the statement. Sent in whole milliseconds, rounded up.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Schema holding the evolved tables.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Field names that are never turned into columns.
    pub fn protected_fields(&self) -> &ProtectedFields {
        &self.protected_fields
    }

    /// Whether `column` belongs to the base model, compared case-folded.
    pub fn is_standard_column(&self, column: &str) -> bool {
        self.standard_columns.contains(&ident::fold(column))
    }

    /// Per-DDL timeout; `None` leaves the session's own setting in force.
    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout
    }

    /// Read the configuration from `ACCRETE_*` environment variables, falling
    /// back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|var| std::env::var(var))
    }

    fn from_vars(
        get: impl Fn(&'static str) -> Result<String, VarError>,
    ) -> Result<Self, ConfigError> {
        let lookup = |var: &'static str| match get(var) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode { var }),
        };

        let mut config = Self::default();

        if let Some(schema) = lookup("ACCRETE_SCHEMA")? {
            if !ident::is_valid(&schema) {
                return Err(ConfigError::Invalid {
                    var: "ACCRETE_SCHEMA",
                    value: schema,
                    expected: "identifier",
                });
            }
            config = config.with_schema(schema);
        }
        if let Some(fields) = lookup("ACCRETE_PROTECTED_FIELDS")? {
            config = config.with_protected_fields(ProtectedFields::new(split_list(&fields)));
        }
        if let Some(columns) = lookup("ACCRETE_STANDARD_COLUMNS")? {
            config = config.with_standard_columns(split_list(&columns));
        }
        if let Some(ms) = lookup("ACCRETE_STATEMENT_TIMEOUT_MS")? {
            // 0 would mean "no timeout" to Postgres
            let parsed = ms.trim().parse::<NonZeroU64>().map_err(|_| ConfigError::Invalid {
                var: "ACCRETE_STATEMENT_TIMEOUT_MS",
                value: ms.clone(),
                expected: "positive number of milliseconds",
            })?;
            config = config.with_statement_timeout(Duration::from_millis(parsed.get()));
        }

        Ok(config)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
