//! Resolved entity metadata.
//!
//! The resolver turns a declaration list into an [`EntityMap`]: one
//! [`ResolvedEntity`] per *registered* entity, with inherited fields merged
//! in. Unregistered declarations get no entry at all; looking one up through
//! [`EntityMap::expect`] is the canonical "metadata not found" failure.
//!
//! An `EntityMap` is immutable once built. A session resolves once at open
//! and every later operation reads from that same map, so a failed lookup or
//! a failed flush can never corrupt the metadata of other entities.

use crate::backend::ComputedColumn;
use crate::error::{MetadataError, Result};
use crate::formula::Formula;
use crate::types::ColumnType;
use std::collections::BTreeMap;

/// A resolved scalar field.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub primary_key: bool,
}

/// A resolved computed field with its parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedComputed {
    pub name: String,
    pub formula: Formula,
}

/// A resolved many-to-one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelation {
    pub name: String,
    /// Referenced entity name. Population always goes through the target's
    /// own resolved metadata, never a snapshot taken at resolution time.
    pub target: String,
    /// Foreign key column on the owning side.
    pub fk_column: String,
    pub nullable: bool,
}

/// The effective persistence metadata of one registered entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub name: String,
    /// Effective table name: the explicit binding, or the default scheme.
    pub table: String,
    /// Primary key column name.
    pub primary_key: String,
    /// Own and inherited scalar fields, parent-first.
    pub fields: Vec<ResolvedField>,
    /// Own and inherited computed fields, parent-first.
    pub computed: Vec<ResolvedComputed>,
    /// Own and inherited relations, parent-first.
    pub relations: Vec<ResolvedRelation>,
}

impl ResolvedEntity {
    /// Look up a scalar field by name.
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a computed field by name.
    pub fn computed_field(&self, name: &str) -> Option<&ResolvedComputed> {
        self.computed.iter().find(|c| c.name == name)
    }

    /// Look up a relation by name.
    pub fn relation(&self, name: &str) -> Option<&ResolvedRelation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// The formula projections the storage engine must evaluate for every
    /// read of this entity.
    pub fn projection(&self) -> Vec<ComputedColumn> {
        self.computed
            .iter()
            .map(|c| ComputedColumn {
                name: c.name.clone(),
                formula: c.formula.clone(),
            })
            .collect()
    }

    /// All stored column names: scalar fields plus relation FK columns.
    pub fn stored_columns(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.relations.iter().map(|r| r.fk_column.as_str()))
            .collect()
    }
}

/// The resolved metadata for a full declaration set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMap {
    entities: BTreeMap<String, ResolvedEntity>,
}

impl EntityMap {
    /// Build a map from resolved entities. Used by the resolver.
    #[must_use]
    pub fn from_entities(entities: Vec<ResolvedEntity>) -> Self {
        Self {
            entities: entities.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    /// Look up an entity's metadata.
    pub fn get(&self, entity: &str) -> Option<&ResolvedEntity> {
        self.entities.get(entity)
    }

    /// Look up an entity's metadata, failing with the canonical
    /// "metadata for entity <Name> not found" error when absent.
    #[allow(clippy::result_large_err)]
    pub fn expect(&self, entity: &str) -> Result<&ResolvedEntity> {
        self.entities
            .get(entity)
            .ok_or_else(|| MetadataError::not_found(entity).into())
    }

    /// Whether the entity has resolved metadata.
    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// Number of resolved entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entities resolved.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over resolved entities in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedEntity> {
        self.entities.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn company() -> ResolvedEntity {
        ResolvedEntity {
            name: "Company".to_string(),
            table: "company".to_string(),
            primary_key: "id".to_string(),
            fields: vec![
                ResolvedField {
                    name: "id".to_string(),
                    column_type: ColumnType::BigInt,
                    nullable: false,
                    primary_key: true,
                },
                ResolvedField {
                    name: "name".to_string(),
                    column_type: ColumnType::Text,
                    nullable: false,
                    primary_key: false,
                },
            ],
            computed: vec![ResolvedComputed {
                name: "name_upper".to_string(),
                formula: Formula::parse("upper(name)").unwrap(),
            }],
            relations: vec![],
        }
    }

    #[test]
    fn test_expect_missing_entity_names_it() {
        let map = EntityMap::from_entities(vec![company()]);
        let err = map.expect("CoolUser2").unwrap_err();
        match err {
            Error::Metadata(meta) => {
                assert_eq!(meta.entity, "CoolUser2");
                assert_eq!(meta.message, "metadata for entity CoolUser2 not found");
            }
            other => panic!("expected metadata error, got {other}"),
        }
    }

    #[test]
    fn test_expect_present_entity() {
        let map = EntityMap::from_entities(vec![company()]);
        let resolved = map.expect("Company").unwrap();
        assert_eq!(resolved.table, "company");
        assert_eq!(resolved.primary_key, "id");
    }

    #[test]
    fn test_projection_carries_formulas() {
        let resolved = company();
        let projection = resolved.projection();
        assert_eq!(projection.len(), 1);
        assert_eq!(projection[0].name, "name_upper");
    }

    #[test]
    fn test_stored_columns_include_fk() {
        let mut resolved = company();
        resolved.relations.push(ResolvedRelation {
            name: "parent".to_string(),
            target: "Company".to_string(),
            fk_column: "parent_id".to_string(),
            nullable: true,
        });
        assert_eq!(resolved.stored_columns(), vec!["id", "name", "parent_id"]);
    }

    #[test]
    fn test_failed_lookup_leaves_map_intact() {
        let map = EntityMap::from_entities(vec![company()]);
        let before = map.clone();
        let _ = map.expect("Nope");
        assert_eq!(map, before);
        assert!(map.contains("Company"));
    }
}
