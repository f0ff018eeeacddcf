//! Storage backend traits and configuration.
//!
//! The backend is the external collaborator: it owns tables and rows, and it
//! is the only place formula projections are evaluated. All operations are
//! async, take a `Cx` context, and return `Outcome` for cancel-correct
//! propagation.

use crate::error::{ConfigError, Error, Result};
use crate::formula::Formula;
use crate::row::Row;
use crate::types::ColumnType;
use crate::value::Value;
use asupersync::{Cx, Outcome};

/// Connection configuration.
///
/// Opaque to metadata resolution; validated only superficially by backends.
///
/// # Example
///
/// ```
/// use entitykit_core::ConnectConfig;
///
/// let config = ConnectConfig::new("app_test")
///     .host("localhost")
///     .port(3307)
///     .username("root")
///     .password("root")
///     .allow_global_context(true);
/// assert_eq!(config.database, "app_test");
/// ```
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Host name or address.
    pub host: String,
    /// Port number.
    pub port: u16,
    /// User name.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Database name.
    pub database: String,
    /// Whether implicit global-context usage is allowed.
    pub allow_global_context: bool,
}

impl ConnectConfig {
    /// Create a configuration for the named database with default host/port.
    #[must_use]
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            host: "localhost".to_string(),
            port: 0,
            username: None,
            password: None,
            database: database.into(),
            allow_global_context: false,
        }
    }

    /// Set the host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the user name.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Allow implicit global-context usage.
    #[must_use]
    pub fn allow_global_context(mut self, value: bool) -> Self {
        self.allow_global_context = value;
        self
    }

    /// Validate the parts every backend relies on.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(Error::Config(ConfigError {
                message: "database name must not be empty".to_string(),
            }));
        }
        Ok(())
    }
}

/// The physical shape of one column, as handed to the backend at
/// schema-create time.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

/// The physical shape of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary key column, if declared.
    pub fn primary_key(&self) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// A named formula projection evaluated by the engine as part of a read.
///
/// Reads carry these alongside the table name; writes never do. That is the
/// whole write-exclusion story for computed fields: the engine cannot store
/// what it is never sent.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedColumn {
    /// Column name in the result row.
    pub name: String,
    /// Formula evaluated against the stored row.
    pub formula: Formula,
}

/// A storage engine connection.
///
/// All operations are async and take a `Cx` context for cancellation
/// support. Implementations must be `Send + Sync`.
pub trait Backend: Send + Sync {
    /// Create a table. Fixture setup only.
    fn create_table(
        &self,
        cx: &Cx,
        spec: &TableSpec,
    ) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Drop a table if it exists. Fixture setup only.
    fn drop_table(&self, cx: &Cx, table: &str)
    -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Check whether a table exists.
    fn table_exists(
        &self,
        cx: &Cx,
        table: &str,
    ) -> impl Future<Output = Outcome<bool, Error>> + Send;

    /// Insert one row. Atomic: on any failure no partial row is stored.
    fn insert(
        &self,
        cx: &Cx,
        table: &str,
        columns: &[String],
        values: &[Value],
    ) -> impl Future<Output = Outcome<(), Error>> + Send;

    /// Fetch one row by key column, evaluating the given projections.
    fn get_by_key(
        &self,
        cx: &Cx,
        table: &str,
        key_column: &str,
        key: &Value,
        computed: &[ComputedColumn],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Fetch all rows of a table, evaluating the given projections.
    fn scan(
        &self,
        cx: &Cx,
        table: &str,
        computed: &[ComputedColumn],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Close the connection gracefully.
    fn close(self, cx: &Cx) -> impl Future<Output = Result<()>> + Send;
}
