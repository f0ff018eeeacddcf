//! Column type definitions.

use serde::{Deserialize, Serialize};

/// The storage type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Boolean column.
    Bool,
    /// 64-bit signed integer column.
    BigInt,
    /// 64-bit floating point column.
    Double,
    /// Text column.
    Text,
    /// JSON document column.
    Json,
}

impl ColumnType {
    /// Get the declared type name, as a storage engine would report it.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            ColumnType::Bool => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Text => "TEXT",
            ColumnType::Json => "JSON",
        }
    }

    /// Check whether a value is admissible for this column type.
    ///
    /// `Value::Null` is admissible for every type; nullability is enforced
    /// separately against the column declaration.
    #[must_use]
    pub fn admits(&self, value: &crate::Value) -> bool {
        use crate::Value;
        match (self, value) {
            (_, Value::Null)
            | (ColumnType::Bool, Value::Bool(_))
            | (ColumnType::BigInt, Value::BigInt(_))
            | (ColumnType::Double, Value::Double(_) | Value::BigInt(_))
            | (ColumnType::Text, Value::Text(_))
            | (ColumnType::Json, Value::Json(_)) => true,
            _ => false,
        }
    }
}
