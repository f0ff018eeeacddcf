//! Query builder for entitykit.
//!
//! [`QueryBuilder`] is the lower-level alternative to
//! `Session::find_one`: it scans an entity's table, filters on stored or
//! computed fields, and eagerly selects joined relations. Because every read
//! carries the entity's computed projections, a record fetched through a
//! join holds exactly the same computed values as one fetched through
//! populate.
//!
//! Builder methods validate against resolved metadata and fail before any
//! statement is issued; only `get_single_result` touches storage.

use entitykit_core::{
    Backend, ComputedColumn, Cx, EntityMap, Error, Outcome, Record, ResolvedEntity, Result, Value,
    ValidationError, ValidationErrorKind,
};

/// A query over one entity with optional eager joins and equality filters.
///
/// # Example
///
/// ```ignore
/// let record = QueryBuilder::for_entity(session.metadata(), "User")?
///     .join_and_select("company", "c")?
///     .where_eq("first_name", "tony".into())?
///     .get_single_result(&cx, session.backend())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder<'a> {
    metadata: &'a EntityMap,
    entity: &'a ResolvedEntity,
    joins: Vec<Join>,
    filters: Vec<(String, Value)>,
}

#[derive(Debug, Clone)]
struct Join {
    relation: String,
    alias: String,
}

impl<'a> QueryBuilder<'a> {
    /// Start a query over the named entity.
    pub fn for_entity(metadata: &'a EntityMap, entity: &str) -> Result<Self> {
        let entity = metadata.expect(entity)?;
        Ok(Self {
            metadata,
            entity,
            joins: Vec::new(),
            filters: Vec::new(),
        })
    }

    /// Eagerly select a many-to-one relation under an alias.
    ///
    /// The joined record lands on the result under the relation's declared
    /// name, hydrated through the target entity's own metadata.
    pub fn join_and_select(mut self, relation: &str, alias: &str) -> Result<Self> {
        let Some(resolved) = self.entity.relation(relation) else {
            return Err(Error::Validation(ValidationError::new(
                ValidationErrorKind::UnknownField,
                self.entity.name.clone(),
                relation,
                format!("entity {} has no relation {relation}", self.entity.name),
            )));
        };
        self.joins.push(Join {
            relation: resolved.name.clone(),
            alias: alias.to_string(),
        });
        Ok(self)
    }

    /// Filter on equality of a stored or computed field.
    pub fn where_eq(mut self, field: &str, value: Value) -> Result<Self> {
        let known = self.entity.field(field).is_some()
            || self.entity.computed_field(field).is_some()
            || self.entity.relations.iter().any(|r| r.fk_column == field);
        if !known {
            return Err(Error::Validation(ValidationError::new(
                ValidationErrorKind::UnknownField,
                self.entity.name.clone(),
                field,
                format!("entity {} has no field {field}", self.entity.name),
            )));
        }
        self.filters.push((field.to_string(), value));
        Ok(self)
    }

    /// Execute the query and return the first matching record, if any.
    ///
    /// Scans the entity's table with its computed projections, applies the
    /// filters, and fetches joined relations for the match.
    #[tracing::instrument(level = "debug", skip(self, cx, backend), fields(entity = %self.entity.name))]
    pub async fn get_single_result<B: Backend>(
        &self,
        cx: &Cx,
        backend: &B,
    ) -> Outcome<Option<Record>, Error> {
        let projection = self.entity.projection();
        let rows = match backend.scan(cx, &self.entity.table, &projection).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        let found = rows.iter().find(|row| {
            self.filters
                .iter()
                .all(|(field, value)| row.get_by_name(field) == Some(value))
        });
        let Some(row) = found else {
            return Outcome::Ok(None);
        };
        let mut record = Record::from_row(self.entity, row);
        for join in &self.joins {
            tracing::debug!(relation = %join.relation, alias = %join.alias, "Selecting joined relation");
            match self.fetch_joined(cx, backend, &record, &join.relation).await {
                Outcome::Ok(Some(related)) => record.attach(join.relation.clone(), related),
                Outcome::Ok(None) => {}
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
        Outcome::Ok(Some(record))
    }

    /// Fetch the joined row for one relation of a hydrated record.
    async fn fetch_joined<B: Backend>(
        &self,
        cx: &Cx,
        backend: &B,
        record: &Record,
        relation: &str,
    ) -> Outcome<Option<Record>, Error> {
        let Some(resolved) = self.entity.relation(relation) else {
            return Outcome::Ok(None);
        };
        let fk = match record.get(&resolved.fk_column) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Outcome::Ok(None),
        };
        let target = match self.metadata.expect(&resolved.target) {
            Ok(t) => t,
            Err(e) => return Outcome::Err(e),
        };
        let projection: Vec<ComputedColumn> = target.projection();
        match backend
            .get_by_key(cx, &target.table, &target.primary_key, &fk, &projection)
            .await
        {
            Outcome::Ok(row) => Outcome::Ok(row.map(|r| Record::from_row(target, &r))),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entitykit_core::{
        ColumnType, ComputedDef, ConnectConfig, EntityDef, FieldDef, RelationDef,
    };
    use entitykit_mem::{MemConnection, MemEngine};
    use entitykit_schema::{SchemaPlan, resolve};

    fn metadata() -> EntityMap {
        let company = EntityDef::new("Company")
            .table("company")
            .field(FieldDef::new("id", ColumnType::BigInt).primary_key(true))
            .field(FieldDef::new("name", ColumnType::Text))
            .computed(ComputedDef::new("name_upper", "upper(name)"));
        let user = EntityDef::new("User")
            .table("user")
            .field(FieldDef::new("id", ColumnType::BigInt).primary_key(true))
            .field(FieldDef::new("first_name", ColumnType::Text))
            .field(FieldDef::new("last_name", ColumnType::Text).nullable(true))
            .computed(ComputedDef::new(
                "full_name",
                "first_name || ' ' || last_name",
            ))
            .relation(RelationDef::many_to_one("company", "Company").nullable(true));
        resolve(&[company, user]).unwrap()
    }

    fn run<T>(fut: impl Future<Output = T>) -> T {
        let rt = asupersync::runtime::RuntimeBuilder::current_thread()
            .build()
            .expect("create asupersync runtime");
        rt.block_on(fut)
    }

    fn unwrap_outcome<T, E: std::fmt::Debug>(outcome: Outcome<T, E>) -> T {
        match outcome {
            Outcome::Ok(v) => v,
            Outcome::Err(e) => panic!("unexpected error: {e:?}"),
            Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
            Outcome::Panicked(p) => panic!("panicked: {p:?}"),
        }
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    async fn seeded_connection(cx: &Cx, map: &EntityMap) -> MemConnection {
        let engine = MemEngine::new();
        let conn = engine.connect(&ConnectConfig::new("app_test")).unwrap();
        unwrap_outcome(SchemaPlan::from_entities(map).create_all(cx, &conn).await);
        unwrap_outcome(
            conn.insert(
                cx,
                "company",
                &cols(&["id", "name"]),
                &[2.into(), "coca cola".into()],
            )
            .await,
        );
        unwrap_outcome(
            conn.insert(
                cx,
                "user",
                &cols(&["id", "first_name", "last_name", "company_id"]),
                &[1.into(), "tony".into(), "soprano".into(), 2.into()],
            )
            .await,
        );
        conn
    }

    #[test]
    fn test_builder_validates_names() {
        let map = metadata();
        let err = QueryBuilder::for_entity(&map, "User")
            .unwrap()
            .join_and_select("employer", "e")
            .unwrap_err();
        match err {
            Error::Validation(v) => assert_eq!(v.kind, ValidationErrorKind::UnknownField),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(QueryBuilder::for_entity(&map, "Ghost").is_err());
    }

    #[test]
    fn test_filter_on_computed_field() {
        run(async {
            let cx = Cx::for_testing();
            let map = metadata();
            let conn = seeded_connection(&cx, &map).await;
            let record = unwrap_outcome(
                QueryBuilder::for_entity(&map, "User")
                    .unwrap()
                    .where_eq("full_name", "tony soprano".into())
                    .unwrap()
                    .get_single_result(&cx, &conn)
                    .await,
            )
            .unwrap();
            assert_eq!(record.get("id"), Some(&Value::BigInt(1)));
        });
    }

    #[test]
    fn test_join_and_select_hydrates_relation() {
        run(async {
            let cx = Cx::for_testing();
            let map = metadata();
            let conn = seeded_connection(&cx, &map).await;
            let record = unwrap_outcome(
                QueryBuilder::for_entity(&map, "User")
                    .unwrap()
                    .join_and_select("company", "c")
                    .unwrap()
                    .where_eq("id", 1.into())
                    .unwrap()
                    .get_single_result(&cx, &conn)
                    .await,
            )
            .unwrap();
            let company = record.related("company").unwrap();
            assert_eq!(company.get("name"), Some(&Value::from("coca cola")));
            assert_eq!(company.get("name_upper"), Some(&Value::from("COCA COLA")));
        });
    }

    #[test]
    fn test_no_match_returns_none() {
        run(async {
            let cx = Cx::for_testing();
            let map = metadata();
            let conn = seeded_connection(&cx, &map).await;
            let result = unwrap_outcome(
                QueryBuilder::for_entity(&map, "User")
                    .unwrap()
                    .where_eq("first_name", "carmela".into())
                    .unwrap()
                    .get_single_result(&cx, &conn)
                    .await,
            );
            assert!(result.is_none());
        });
    }
}
