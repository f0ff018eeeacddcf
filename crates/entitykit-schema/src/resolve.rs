//! The entity metadata resolver.
//!
//! [`resolve`] is a pure function from a declaration list to an
//! [`EntityMap`]. It never touches storage: every failure it can produce is
//! a [`MetadataError`], deterministic and local. Whether a resolved table
//! name actually exists is a separate, later-stage question that only an
//! attempted read or write can answer.

use entitykit_core::error::{MetadataError, MetadataErrorKind};
use entitykit_core::{
    EntityDef, EntityMap, Formula, ResolvedComputed, ResolvedEntity, ResolvedField,
    ResolvedRelation, default_table_name, is_valid_identifier,
};
use std::collections::BTreeMap;

type ResolveResult<T> = Result<T, MetadataError>;

/// Resolve a declaration set into per-entity persistence metadata.
///
/// Only *registered* declarations (explicit table binding or
/// [`EntityDef::register`]) produce an entry; a plain derived type stays out
/// of the map entirely, so later use fails with the canonical
/// "metadata for entity `<Name>` not found" error.
///
/// Resolution is idempotent: the same declaration set always produces the
/// same map, and nothing here keeps state between calls.
#[allow(clippy::result_large_err)]
pub fn resolve(defs: &[EntityDef]) -> ResolveResult<EntityMap> {
    let index = build_index(defs)?;

    let mut resolved = Vec::new();
    for def in defs {
        check_shape(def)?;
        // Walk the chain for every declaration so broken inheritance links
        // fail resolution even on unregistered types.
        let chain = inheritance_chain(def, &index)?;
        if !def.registered {
            continue;
        }
        resolved.push(resolve_entity(def, &chain, &index)?);
    }

    let map = EntityMap::from_entities(resolved);
    tracing::debug!(entities = map.len(), "Resolved entity metadata");
    Ok(map)
}

fn build_index<'a>(
    defs: &'a [EntityDef],
) -> ResolveResult<BTreeMap<&'static str, &'a EntityDef>> {
    let mut index = BTreeMap::new();
    for def in defs {
        if index.insert(def.name, def).is_some() {
            return Err(MetadataError::new(
                MetadataErrorKind::Duplicate,
                def.name,
                format!("entity {} declared more than once", def.name),
            ));
        }
    }
    Ok(index)
}

/// Validate the names a declaration carries.
fn check_shape(def: &EntityDef) -> ResolveResult<()> {
    if !is_valid_identifier(def.name) {
        return Err(invalid_identifier(def.name, def.name, "entity name"));
    }
    if let Some(table) = def.table {
        if !is_valid_identifier(table) {
            return Err(invalid_identifier(def.name, table, "table name"));
        }
    }
    for field in &def.fields {
        if !is_valid_identifier(field.name) {
            return Err(invalid_identifier(def.name, field.name, "field name"));
        }
    }
    for computed in &def.computed {
        if !is_valid_identifier(computed.name) {
            return Err(invalid_identifier(def.name, computed.name, "computed field name"));
        }
    }
    for relation in &def.relations {
        if !is_valid_identifier(relation.name) {
            return Err(invalid_identifier(def.name, relation.name, "relation name"));
        }
        if let Some(column) = relation.fk_column {
            if !is_valid_identifier(column) {
                return Err(invalid_identifier(def.name, column, "foreign key column"));
            }
        }
    }
    Ok(())
}

fn invalid_identifier(entity: &str, name: &str, what: &str) -> MetadataError {
    MetadataError::new(
        MetadataErrorKind::InvalidIdentifier,
        entity,
        format!("{what} '{name}' on entity {entity} is not a valid identifier"),
    )
}

/// Collect the inheritance chain root-first, ending at `def` itself.
fn inheritance_chain<'a>(
    def: &'a EntityDef,
    index: &BTreeMap<&'static str, &'a EntityDef>,
) -> ResolveResult<Vec<&'a EntityDef>> {
    let mut chain = vec![def];
    let mut seen = vec![def.name];
    let mut current = def;
    while let Some(parent_name) = current.extends {
        let parent = index.get(parent_name).ok_or_else(|| {
            MetadataError::new(
                MetadataErrorKind::UnknownParent,
                def.name,
                format!("entity {} extends unknown entity {parent_name}", def.name),
            )
        })?;
        if seen.contains(&parent.name) {
            return Err(MetadataError::new(
                MetadataErrorKind::InheritanceCycle,
                def.name,
                format!("inheritance cycle through entity {}", parent.name),
            ));
        }
        seen.push(parent.name);
        chain.push(parent);
        current = parent;
    }
    chain.reverse();
    Ok(chain)
}

/// Merge a chain into the effective metadata of one registered entity.
fn resolve_entity(
    def: &EntityDef,
    chain: &[&EntityDef],
    index: &BTreeMap<&'static str, &EntityDef>,
) -> ResolveResult<ResolvedEntity> {
    let mut fields: Vec<ResolvedField> = Vec::new();
    let mut computed_defs: Vec<(&'static str, &'static str)> = Vec::new();
    let mut relations: Vec<ResolvedRelation> = Vec::new();

    // Parent-first merge; a redeclared name overrides in place.
    for link in chain {
        for field in &link.fields {
            let resolved = ResolvedField {
                name: field.name.to_string(),
                column_type: field.column_type,
                nullable: field.nullable,
                primary_key: field.primary_key,
            };
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = resolved,
                None => fields.push(resolved),
            }
        }
        for computed in &link.computed {
            match computed_defs.iter_mut().find(|(name, _)| *name == computed.name) {
                Some(existing) => existing.1 = computed.formula,
                None => computed_defs.push((computed.name, computed.formula)),
            }
        }
        for relation in &link.relations {
            let resolved = ResolvedRelation {
                name: relation.name.to_string(),
                target: relation.target.to_string(),
                fk_column: relation
                    .fk_column
                    .map_or_else(|| format!("{}_id", relation.name), ToString::to_string),
                nullable: relation.nullable,
            };
            match relations.iter_mut().find(|r| r.name == relation.name) {
                Some(existing) => *existing = resolved,
                None => relations.push(resolved),
            }
        }
    }

    let primary_key = fields
        .iter()
        .find(|f| f.primary_key)
        .map(|f| f.name.clone())
        .ok_or_else(|| {
            MetadataError::new(
                MetadataErrorKind::MissingPrimaryKey,
                def.name,
                format!("entity {} resolved without a primary key", def.name),
            )
        })?;

    // Relations must point at something that itself resolves.
    for relation in &relations {
        let target_registered = index
            .get(relation.target.as_str())
            .is_some_and(|target| target.registered);
        if !target_registered {
            return Err(MetadataError::new(
                MetadataErrorKind::UnknownRelationTarget,
                def.name,
                format!(
                    "relation {} on entity {} targets {}, which has no resolved metadata",
                    relation.name, def.name, relation.target
                ),
            ));
        }
    }

    // Computed formulas must parse and reference stored columns only.
    let stored: Vec<&str> = fields
        .iter()
        .map(|f| f.name.as_str())
        .chain(relations.iter().map(|r| r.fk_column.as_str()))
        .collect();
    let mut computed = Vec::with_capacity(computed_defs.len());
    for (name, source) in computed_defs {
        let formula = Formula::parse(source).map_err(|e| {
            MetadataError::new(
                MetadataErrorKind::InvalidFormula,
                def.name,
                format!("formula for {}.{name} failed to parse: {e}", def.name),
            )
        })?;
        for column in formula.columns() {
            if !stored.contains(&column) {
                return Err(MetadataError::new(
                    MetadataErrorKind::InvalidFormula,
                    def.name,
                    format!(
                        "formula for {}.{name} references unknown column {column}",
                        def.name
                    ),
                ));
            }
        }
        computed.push(ResolvedComputed {
            name: name.to_string(),
            formula,
        });
    }

    // The table binding is never inherited: a registered derived type without
    // its own binding lands on the default naming scheme, wherever that may
    // point.
    let table = def
        .table
        .map_or_else(|| default_table_name(def.name), ToString::to_string);

    Ok(ResolvedEntity {
        name: def.name.to_string(),
        table,
        primary_key,
        fields,
        computed,
        relations,
    })
}
