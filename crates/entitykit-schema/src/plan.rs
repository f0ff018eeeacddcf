//! Schema planning: physical table shapes from resolved metadata.
//!
//! Used only for fixture setup (create/drop); the resolver contract itself
//! never touches storage.

use entitykit_core::{
    Backend, ColumnSpec, ColumnType, Cx, EntityMap, Error, Outcome, ResolvedEntity, TableSpec,
};

/// A set of table specs derived from an [`EntityMap`].
///
/// Entities that share a table binding plan one table: their column sets are
/// merged by name. Computed fields never appear here; they are read-time
/// projections, not columns.
#[derive(Debug, Clone, Default)]
pub struct SchemaPlan {
    tables: Vec<TableSpec>,
}

impl SchemaPlan {
    /// Build a plan covering every entity in the map.
    #[must_use]
    pub fn from_entities(map: &EntityMap) -> Self {
        let mut tables: Vec<TableSpec> = Vec::new();
        for entity in map.iter() {
            let spec = table_spec(entity);
            match tables.iter_mut().find(|t| t.name == spec.name) {
                Some(existing) => merge_columns(existing, spec),
                None => tables.push(spec),
            }
        }
        Self { tables }
    }

    /// The planned table specs, in entity name order of first appearance.
    pub fn tables(&self) -> &[TableSpec] {
        &self.tables
    }

    /// Create every planned table. Fails on the first error.
    pub async fn create_all<B: Backend>(&self, cx: &Cx, backend: &B) -> Outcome<usize, Error> {
        tracing::debug!(tables = self.tables.len(), "Creating schema");
        let mut created = 0;
        for spec in &self.tables {
            match backend.create_table(cx, spec).await {
                Outcome::Ok(()) => created += 1,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
        Outcome::Ok(created)
    }

    /// Drop every planned table that exists, in reverse creation order.
    pub async fn drop_all<B: Backend>(&self, cx: &Cx, backend: &B) -> Outcome<usize, Error> {
        tracing::debug!(tables = self.tables.len(), "Dropping schema");
        let mut dropped = 0;
        for spec in self.tables.iter().rev() {
            match backend.drop_table(cx, &spec.name).await {
                Outcome::Ok(()) => dropped += 1,
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
        Outcome::Ok(dropped)
    }
}

/// The physical shape of one resolved entity: scalar fields plus a BIGINT
/// column per relation foreign key.
fn table_spec(entity: &ResolvedEntity) -> TableSpec {
    let mut columns: Vec<ColumnSpec> = entity
        .fields
        .iter()
        .map(|f| ColumnSpec {
            name: f.name.clone(),
            column_type: f.column_type,
            nullable: f.nullable,
            primary_key: f.primary_key,
        })
        .collect();
    for relation in &entity.relations {
        if columns.iter().all(|c| c.name != relation.fk_column) {
            columns.push(ColumnSpec {
                name: relation.fk_column.clone(),
                column_type: ColumnType::BigInt,
                nullable: relation.nullable,
                primary_key: false,
            });
        }
    }
    TableSpec {
        name: entity.table.clone(),
        columns,
    }
}

fn merge_columns(existing: &mut TableSpec, incoming: TableSpec) {
    for column in incoming.columns {
        if existing.columns.iter().all(|c| c.name != column.name) {
            existing.columns.push(column);
        }
    }
}
