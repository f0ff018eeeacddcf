//! Entity declarations.
//!
//! Declarations are plain runtime values built once at startup and handed to
//! the resolver as an explicit list. Persistability is an explicit marking:
//! either a table binding or a bare [`EntityDef::register`] call. Extending a
//! base entity never inherits its persistence marking.

use crate::types::ColumnType;

/// A declared scalar field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Field name, also the column name.
    pub name: &'static str,
    /// Declared column type.
    pub column_type: ColumnType,
    /// Whether NULL is admissible.
    pub nullable: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
}

impl FieldDef {
    /// Create a new field with minimal required data.
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: false,
            primary_key: false,
        }
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }
}

/// A declared computed field, backed by a formula the storage engine
/// evaluates on read. Never part of an insert payload.
#[derive(Debug, Clone)]
pub struct ComputedDef {
    /// Field name as exposed on hydrated records.
    pub name: &'static str,
    /// Formula source text; parsed and validated at resolution time.
    pub formula: &'static str,
}

impl ComputedDef {
    /// Create a new computed field.
    pub const fn new(name: &'static str, formula: &'static str) -> Self {
        Self { name, formula }
    }
}

/// A declared many-to-one relation to another entity.
#[derive(Debug, Clone)]
pub struct RelationDef {
    /// Field name as exposed on hydrated records.
    pub name: &'static str,
    /// Name of the referenced entity.
    pub target: &'static str,
    /// Foreign key column holding the target's primary key. Defaults to
    /// `<name>_id` when not set.
    pub fk_column: Option<&'static str>,
    /// Whether the relation may be absent.
    pub nullable: bool,
}

impl RelationDef {
    /// Create a many-to-one relation to `target`.
    pub const fn many_to_one(name: &'static str, target: &'static str) -> Self {
        Self {
            name,
            target,
            fk_column: None,
            nullable: false,
        }
    }

    /// Override the foreign key column name.
    pub const fn fk_column(mut self, column: &'static str) -> Self {
        self.fk_column = Some(column);
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }
}

/// A declared entity type.
///
/// # Example
///
/// ```
/// use entitykit_core::{ColumnType, ComputedDef, EntityDef, FieldDef, RelationDef};
///
/// let user = EntityDef::new("User")
///     .table("user")
///     .field(FieldDef::new("id", ColumnType::BigInt).primary_key(true))
///     .field(FieldDef::new("first_name", ColumnType::Text))
///     .field(FieldDef::new("last_name", ColumnType::Text))
///     .computed(ComputedDef::new("full_name", "first_name || ' ' || last_name"))
///     .relation(RelationDef::many_to_one("company", "Company").nullable(true));
///
/// // A derived type opts into persistence explicitly; extending alone
/// // does not make it persistable.
/// let derived = EntityDef::extending("CoolUser", "User").register();
/// ```
#[derive(Debug, Clone)]
pub struct EntityDef {
    /// Entity name, unique within a declaration set.
    pub name: &'static str,
    /// Parent entity name for single inheritance.
    pub extends: Option<&'static str>,
    /// Explicit table binding. Absent means the default naming scheme
    /// applies, when the entity is registered at all.
    pub table: Option<&'static str>,
    /// Explicit persistence marking. A table binding implies it.
    pub registered: bool,
    /// Declared scalar fields, in declaration order.
    pub fields: Vec<FieldDef>,
    /// Declared computed fields, in declaration order.
    pub computed: Vec<ComputedDef>,
    /// Declared relations, in declaration order.
    pub relations: Vec<RelationDef>,
}

impl EntityDef {
    /// Declare a new root entity. Not persistable until registered or bound
    /// to a table.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            extends: None,
            table: None,
            registered: false,
            fields: Vec::new(),
            computed: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Declare an entity extending `parent`.
    #[must_use]
    pub fn extending(name: &'static str, parent: &'static str) -> Self {
        let mut def = Self::new(name);
        def.extends = Some(parent);
        def
    }

    /// Bind the entity to an explicit table name. Implies registration.
    #[must_use]
    pub fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self.registered = true;
        self
    }

    /// Mark the entity as persistable without binding a table name.
    ///
    /// The resolver then applies the default table naming scheme, which may
    /// or may not match anything that exists in storage.
    #[must_use]
    pub fn register(mut self) -> Self {
        self.registered = true;
        self
    }

    /// Add a scalar field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a computed field.
    #[must_use]
    pub fn computed(mut self, computed: ComputedDef) -> Self {
        self.computed.push(computed);
        self
    }

    /// Add a relation.
    #[must_use]
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_binding_implies_registration() {
        let def = EntityDef::new("User").table("user");
        assert!(def.registered);
        assert_eq!(def.table, Some("user"));
    }

    #[test]
    fn test_plain_extension_is_not_registered() {
        let def = EntityDef::extending("CoolUser2", "User");
        assert!(!def.registered);
        assert!(def.table.is_none());
        assert_eq!(def.extends, Some("User"));
    }

    #[test]
    fn test_register_without_table() {
        let def = EntityDef::extending("CoolUser", "User").register();
        assert!(def.registered);
        assert!(def.table.is_none());
    }

    #[test]
    fn test_field_builder() {
        let field = FieldDef::new("id", ColumnType::BigInt).primary_key(true);
        assert!(field.primary_key);
        assert!(!field.nullable);
    }

    #[test]
    fn test_relation_builder_defaults() {
        let rel = RelationDef::many_to_one("company", "Company").nullable(true);
        assert_eq!(rel.target, "Company");
        assert!(rel.nullable);
        assert!(rel.fk_column.is_none());
    }
}
