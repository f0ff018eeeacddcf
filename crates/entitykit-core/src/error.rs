//! Error types for entitykit operations.
//!
//! Two disjoint failure classes matter here:
//!
//! - [`MetadataError`]: raised synchronously before any I/O, when an entity's
//!   persistence metadata cannot be found or cannot be resolved. Once an
//!   entity resolved successfully, this error is never raised for it again
//!   within the same session.
//! - [`StorageError`]: raised only during an attempted read or write, when
//!   the resolved table name does not exist in storage or a constraint is
//!   violated by the statement.

use std::fmt;

/// The primary error type for all entitykit operations.
#[derive(Debug)]
pub enum Error {
    /// Metadata resolution errors (pre-I/O, deterministic)
    Metadata(MetadataError),
    /// Storage engine errors (observable only at attempted I/O)
    Storage(StorageError),
    /// Type conversion errors
    Type(TypeError),
    /// Connection configuration errors
    Config(ConfigError),
    /// Write payload validation errors
    Validation(ValidationError),
    /// Custom error with message
    Custom(String),
}

/// An entity's metadata could not be found or resolved.
#[derive(Debug, Clone)]
pub struct MetadataError {
    pub kind: MetadataErrorKind,
    /// The entity the failure is about. Always set so the message can name it.
    pub entity: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataErrorKind {
    /// The entity carries no persistence marking of its own.
    NotRegistered,
    /// Two declarations share the same entity name.
    Duplicate,
    /// The declared parent entity does not exist.
    UnknownParent,
    /// The inheritance chain loops back on itself.
    InheritanceCycle,
    /// A registered entity resolved without any primary key column.
    MissingPrimaryKey,
    /// A relation points at an entity with no resolved metadata.
    UnknownRelationTarget,
    /// A computed field's formula failed to parse or references an
    /// unknown column.
    InvalidFormula,
    /// An entity or table name is not a valid identifier.
    InvalidIdentifier,
}

impl MetadataError {
    /// The standard not-found error for an unresolvable entity.
    pub fn not_found(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        let message = format!("metadata for entity {entity} not found");
        Self {
            kind: MetadataErrorKind::NotRegistered,
            entity,
            message,
        }
    }

    /// A resolution failure of the given kind.
    pub fn new(
        kind: MetadataErrorKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }
}

/// A read or write against storage failed.
#[derive(Debug, Clone)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    /// The table the statement targeted.
    pub table: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// The resolved table name does not exist in storage.
    TableNotFound,
    /// The table already exists (schema create).
    TableExists,
    /// The statement referenced a column the table does not have.
    UnknownColumn,
    /// A non-nullable column was given NULL or omitted.
    NotNullViolation,
    /// A value did not match the column's declared type.
    TypeMismatch,
    /// The primary key value already exists in the table.
    DuplicateKey,
    /// The connection was already closed.
    ConnectionClosed,
}

impl StorageError {
    /// The standard table-not-found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        let table = table.into();
        let message = format!("table {table} does not exist");
        Self {
            kind: StorageErrorKind::TableNotFound,
            table,
            message,
        }
    }

    /// A storage failure of the given kind.
    pub fn new(
        kind: StorageErrorKind,
        table: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            table: table.into(),
            message: message.into(),
        }
    }
}

/// A value could not be converted to the requested type.
#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

/// Connection configuration was rejected.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

/// A write payload failed validation before any I/O was attempted.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The entity the payload was built for.
    pub entity: String,
    /// The offending field name.
    pub field: String,
    pub kind: ValidationErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The payload names a field the entity does not have.
    UnknownField,
    /// The payload tries to set a computed field.
    ComputedFieldWrite,
    /// A required field is missing or NULL.
    Required,
}

impl ValidationError {
    pub fn new(
        kind: ValidationErrorKind,
        entity: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

impl Error {
    /// Is this a metadata resolution failure (caught before any I/O)?
    pub fn is_metadata(&self) -> bool {
        matches!(self, Error::Metadata(_))
    }

    /// Is this a storage-location or constraint failure (caught at I/O)?
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Get the entity name this error is about, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            Error::Metadata(e) => Some(&e.entity),
            Error::Validation(e) => Some(&e.entity),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Metadata(e) => write!(f, "Metadata error: {}", e.message),
            Error::Storage(e) => write!(f, "Storage error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Validation(e) => {
                write!(f, "Validation error on '{}': {}", e.field, e.message)
            }
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<MetadataError> for Error {
    fn from(err: MetadataError) -> Self {
        Error::Metadata(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

/// Result type alias for entitykit operations.
pub type Result<T> = std::result::Result<T, Error>;
