//! In-memory storage engine.
//!
//! Tables live in a `BTreeMap` behind an `Arc<Mutex<>>`, so connections from
//! the same engine see the same data. A row is stored as a name-to-value
//! map; formula projections are evaluated against that map at read time and
//! appended to the result row. Writes never carry projections, so computed
//! values are never stored.

#![allow(clippy::result_large_err)]

use entitykit_core::{
    Backend, ColumnInfo, ComputedColumn, ConnectConfig, Cx, Error, Outcome, Result, Row,
    StorageError, StorageErrorKind, TableSpec, Value,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type StoredRow = BTreeMap<String, Value>;

/// One in-memory table: its declared shape plus stored rows in insert order.
#[derive(Debug, Clone)]
struct MemTable {
    spec: TableSpec,
    rows: Vec<StoredRow>,
}

/// An in-memory storage engine.
///
/// Cheap to clone; clones share the same tables. Each [`connect`] call hands
/// out a [`MemConnection`] over that shared storage, so data written through
/// one connection is visible to the next.
///
/// [`connect`]: MemEngine::connect
///
/// # Example
///
/// ```
/// use entitykit_core::ConnectConfig;
/// use entitykit_mem::MemEngine;
///
/// let engine = MemEngine::new();
/// let conn = engine.connect(&ConnectConfig::new("app_test")).unwrap();
/// drop(conn);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemEngine {
    tables: Arc<Mutex<BTreeMap<String, MemTable>>>,
}

impl MemEngine {
    /// Create an engine with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection over this engine's shared storage.
    pub fn connect(&self, config: &ConnectConfig) -> Result<MemConnection> {
        config.validate()?;
        tracing::debug!(database = %config.database, "Opening in-memory connection");
        Ok(MemConnection {
            tables: Arc::clone(&self.tables),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// A connection to a [`MemEngine`].
///
/// Clones share the closed flag: closing any clone closes them all, and every
/// later operation fails with a `ConnectionClosed` storage error.
#[derive(Debug, Clone)]
pub struct MemConnection {
    tables: Arc<Mutex<BTreeMap<String, MemTable>>>,
    closed: Arc<AtomicBool>,
}

impl MemConnection {
    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Storage(StorageError::new(
                StorageErrorKind::ConnectionClosed,
                "",
                "connection is closed",
            )));
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, MemTable>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Validate one row against the table shape. Returns the full stored row
    /// with absent nullable columns filled with `Null`.
    fn validate_row(
        table: &MemTable,
        columns: &[String],
        values: &[Value],
    ) -> Result<StoredRow> {
        let name = &table.spec.name;
        for column in columns {
            if table.spec.column(column).is_none() {
                return Err(Error::Storage(StorageError::new(
                    StorageErrorKind::UnknownColumn,
                    name.clone(),
                    format!("column {column} does not exist on table {name}"),
                )));
            }
        }
        let mut row = StoredRow::new();
        for spec in &table.spec.columns {
            let value = columns
                .iter()
                .position(|c| *c == spec.name)
                .and_then(|i| values.get(i))
                .cloned()
                .unwrap_or(Value::Null);
            if value.is_null() && !spec.nullable {
                return Err(Error::Storage(StorageError::new(
                    StorageErrorKind::NotNullViolation,
                    name.clone(),
                    format!("column {} on table {name} must not be null", spec.name),
                )));
            }
            if !spec.column_type.admits(&value) {
                return Err(Error::Storage(StorageError::new(
                    StorageErrorKind::TypeMismatch,
                    name.clone(),
                    format!(
                        "column {} on table {name} expects {}, got {}",
                        spec.name,
                        spec.column_type.type_name(),
                        value.type_name()
                    ),
                )));
            }
            row.insert(spec.name.clone(), value);
        }
        if let Some(pk) = table.spec.primary_key() {
            let key = &row[&pk.name];
            if !key.is_null() && table.rows.iter().any(|r| r.get(&pk.name) == Some(key)) {
                return Err(Error::Storage(StorageError::new(
                    StorageErrorKind::DuplicateKey,
                    name.clone(),
                    format!("duplicate key {key} for table {name}"),
                )));
            }
        }
        Ok(row)
    }
}

/// Evaluate projections against a stored row and produce the result row:
/// declared columns in shape order, then one column per projection.
fn project(spec: &TableSpec, computed: &[ComputedColumn], stored: &StoredRow) -> (Vec<String>, Vec<Value>) {
    let mut names = Vec::with_capacity(spec.columns.len() + computed.len());
    let mut values = Vec::with_capacity(spec.columns.len() + computed.len());
    for column in &spec.columns {
        names.push(column.name.clone());
        values.push(stored.get(&column.name).cloned().unwrap_or(Value::Null));
    }
    for projection in computed {
        names.push(projection.name.clone());
        values.push(projection.formula.evaluate(stored));
    }
    (names, values)
}

impl Backend for MemConnection {
    async fn create_table(&self, _cx: &Cx, spec: &TableSpec) -> Outcome<(), Error> {
        if let Err(e) = self.check_open() {
            return Outcome::Err(e);
        }
        let mut tables = self.lock();
        if tables.contains_key(&spec.name) {
            return Outcome::Err(Error::Storage(StorageError::new(
                StorageErrorKind::TableExists,
                spec.name.clone(),
                format!("table {} already exists", spec.name),
            )));
        }
        tracing::debug!(table = %spec.name, columns = spec.columns.len(), "Creating table");
        tables.insert(
            spec.name.clone(),
            MemTable {
                spec: spec.clone(),
                rows: Vec::new(),
            },
        );
        Outcome::Ok(())
    }

    async fn drop_table(&self, _cx: &Cx, table: &str) -> Outcome<(), Error> {
        if let Err(e) = self.check_open() {
            return Outcome::Err(e);
        }
        self.lock().remove(table);
        Outcome::Ok(())
    }

    async fn table_exists(&self, _cx: &Cx, table: &str) -> Outcome<bool, Error> {
        if let Err(e) = self.check_open() {
            return Outcome::Err(e);
        }
        Outcome::Ok(self.lock().contains_key(table))
    }

    async fn insert(
        &self,
        _cx: &Cx,
        table: &str,
        columns: &[String],
        values: &[Value],
    ) -> Outcome<(), Error> {
        if let Err(e) = self.check_open() {
            return Outcome::Err(e);
        }
        let mut tables = self.lock();
        let Some(entry) = tables.get_mut(table) else {
            return Outcome::Err(Error::Storage(StorageError::table_not_found(table)));
        };
        // Validate the whole row before storing anything.
        let row = match MemConnection::validate_row(entry, columns, values) {
            Ok(row) => row,
            Err(e) => return Outcome::Err(e),
        };
        tracing::debug!(table, columns = columns.len(), "Inserting row");
        entry.rows.push(row);
        Outcome::Ok(())
    }

    async fn get_by_key(
        &self,
        _cx: &Cx,
        table: &str,
        key_column: &str,
        key: &Value,
        computed: &[ComputedColumn],
    ) -> Outcome<Option<Row>, Error> {
        if let Err(e) = self.check_open() {
            return Outcome::Err(e);
        }
        let tables = self.lock();
        let Some(entry) = tables.get(table) else {
            return Outcome::Err(Error::Storage(StorageError::table_not_found(table)));
        };
        let found = entry
            .rows
            .iter()
            .find(|r| r.get(key_column) == Some(key));
        let Some(stored) = found else {
            return Outcome::Ok(None);
        };
        let (names, values) = project(&entry.spec, computed, stored);
        Outcome::Ok(Some(Row::new(names, values)))
    }

    async fn scan(
        &self,
        _cx: &Cx,
        table: &str,
        computed: &[ComputedColumn],
    ) -> Outcome<Vec<Row>, Error> {
        if let Err(e) = self.check_open() {
            return Outcome::Err(e);
        }
        let tables = self.lock();
        let Some(entry) = tables.get(table) else {
            return Outcome::Err(Error::Storage(StorageError::table_not_found(table)));
        };
        let mut info: Option<Arc<ColumnInfo>> = None;
        let mut rows = Vec::with_capacity(entry.rows.len());
        for stored in &entry.rows {
            let (names, values) = project(&entry.spec, computed, stored);
            let columns = info
                .get_or_insert_with(|| Arc::new(ColumnInfo::new(names)))
                .clone();
            rows.push(Row::with_columns(columns, values));
        }
        Outcome::Ok(rows)
    }

    async fn close(self, _cx: &Cx) -> Result<()> {
        tracing::debug!("Closing in-memory connection");
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
