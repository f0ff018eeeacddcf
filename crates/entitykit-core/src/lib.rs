//! Core types and traits for entitykit.
//!
//! This crate provides the foundational abstractions for entity metadata
//! resolution and persistence:
//!
//! - `EntityDef` and friends for runtime entity declarations
//! - `EntityMap` / `ResolvedEntity` for resolved metadata
//! - `Formula` expressions for computed fields
//! - `Backend` trait for storage engines
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome, RegionId, TaskId};

pub mod backend;
pub mod entity;
pub mod error;
pub mod formula;
pub mod identifiers;
pub mod metadata;
pub mod record;
pub mod row;
pub mod types;
pub mod value;

pub use backend::{Backend, ColumnSpec, ComputedColumn, ConnectConfig, TableSpec};
pub use entity::{ComputedDef, EntityDef, FieldDef, RelationDef};
pub use error::{
    ConfigError, Error, MetadataError, MetadataErrorKind, Result, StorageError, StorageErrorKind,
    TypeError, ValidationError, ValidationErrorKind,
};
pub use formula::{Formula, FormulaParseError};
pub use identifiers::{default_table_name, is_valid_identifier};
pub use metadata::{EntityMap, ResolvedComputed, ResolvedEntity, ResolvedField, ResolvedRelation};
pub use record::Record;
pub use row::{ColumnInfo, FromValue, Row};
pub use types::ColumnType;
pub use value::Value;
