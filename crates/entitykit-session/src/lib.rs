//! Session lifecycle and persistence operations for entitykit.
//!
//! A [`Session`] pairs a resolved [`EntityMap`] with a storage backend.
//! Metadata is resolved exactly once, when the session opens; every later
//! operation reads from that immutable map. The split keeps the two error
//! classes disjoint: a failed lookup is a metadata error raised before any
//! statement is issued, while a missing table surfaces as a storage error
//! only when a flush or find actually reaches the engine.
//!
//! # Example
//!
//! ```ignore
//! let engine = MemEngine::new();
//! let conn = engine.connect(&ConnectConfig::new("app_test"))?;
//! let session = Session::open(&entities, conn)?;
//!
//! let user = session.create("User", &[("first_name", "tony".into())])?;
//! session.persist_and_flush(&cx, &user).await?;
//!
//! let found = session
//!     .find_one(&cx, "User", &1.into(), &FindOptions::new().populate("company"))
//!     .await?;
//! session.close(&cx).await?;
//! ```

use entitykit_core::{
    Backend, ComputedColumn, Cx, EntityDef, EntityMap, Error, Outcome, Record, ResolvedEntity,
    Result, Row, Value, ValidationError, ValidationErrorKind,
};
use entitykit_schema::resolve;

// ============================================================================
// Find Options
// ============================================================================

/// Options for [`Session::find_one`].
///
/// # Example
///
/// ```
/// use entitykit_session::FindOptions;
///
/// let options = FindOptions::new().populate("company");
/// assert_eq!(options.populated(), ["company"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    populate: Vec<String>,
}

impl FindOptions {
    /// Options with nothing populated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request population of a many-to-one relation by name.
    #[must_use]
    pub fn populate(mut self, relation: impl Into<String>) -> Self {
        self.populate.push(relation.into());
        self
    }

    /// The relations to populate, in request order.
    pub fn populated(&self) -> &[String] {
        &self.populate
    }
}

// ============================================================================
// Session
// ============================================================================

/// A unit of metadata plus one storage connection.
///
/// Opening a session resolves the declaration list; a resolution failure
/// means no session exists at all, so there is no half-initialized state to
/// reason about. The resolved map is immutable for the session's lifetime.
#[derive(Debug)]
pub struct Session<B: Backend> {
    metadata: EntityMap,
    backend: B,
}

impl<B: Backend> Session<B> {
    /// Resolve the declarations and open a session over the backend.
    ///
    /// Fails with a metadata error before any statement is issued if the
    /// declarations do not resolve.
    pub fn open(defs: &[EntityDef], backend: B) -> Result<Self> {
        let metadata = resolve(defs)?;
        tracing::debug!(entities = metadata.len(), "Session opened");
        Ok(Self { metadata, backend })
    }

    /// The resolved metadata this session operates on.
    pub fn metadata(&self) -> &EntityMap {
        &self.metadata
    }

    /// Create a new record of the given entity from field/value pairs.
    ///
    /// Pairs are validated against resolved metadata: unknown names and
    /// computed field names are rejected. A relation may be set under its
    /// declared name with the target's primary key value; the value lands on
    /// the foreign key column.
    pub fn create(&self, entity: &str, pairs: &[(&str, Value)]) -> Result<Record> {
        let resolved = self.metadata.expect(entity)?;
        let mut record = Record::new(resolved.name.clone());
        for (name, value) in pairs {
            if resolved.computed_field(name).is_some() {
                return Err(Error::Validation(ValidationError::new(
                    ValidationErrorKind::ComputedFieldWrite,
                    entity,
                    *name,
                    format!("field {name} is computed and cannot be written"),
                )));
            }
            if resolved.field(name).is_some() {
                record.set(*name, value.clone());
                continue;
            }
            if let Some(relation) = resolved.relation(name) {
                record.set(relation.fk_column.clone(), value.clone());
                continue;
            }
            if resolved.relations.iter().any(|r| r.fk_column == *name) {
                record.set(*name, value.clone());
                continue;
            }
            return Err(Error::Validation(ValidationError::new(
                ValidationErrorKind::UnknownField,
                entity,
                *name,
                format!("entity {entity} has no field {name}"),
            )));
        }
        Ok(record)
    }

    /// Write a record to its entity's table.
    ///
    /// The insert carries only stored columns the record holds values for.
    /// Computed fields are never part of the payload.
    #[tracing::instrument(level = "debug", skip(self, cx, record), fields(entity = record.entity()))]
    pub async fn persist_and_flush(&self, cx: &Cx, record: &Record) -> Outcome<(), Error> {
        let resolved = match self.metadata.expect(record.entity()) {
            Ok(r) => r,
            Err(e) => return Outcome::Err(e),
        };
        let mut columns: Vec<String> = Vec::new();
        let mut values = Vec::new();
        for column in resolved.stored_columns() {
            if let Some(value) = record.get(column) {
                columns.push(column.to_string());
                values.push(value.clone());
            }
        }
        self.backend
            .insert(cx, &resolved.table, &columns, &values)
            .await
    }

    /// Fetch one record by primary key.
    ///
    /// The read always carries the entity's computed projections, so the
    /// returned record holds every computed field. Relations named in
    /// `options` are populated through the target entity's own metadata; a
    /// NULL foreign key leaves the relation unpopulated.
    #[tracing::instrument(level = "debug", skip(self, cx, key, options))]
    pub async fn find_one(
        &self,
        cx: &Cx,
        entity: &str,
        key: &Value,
        options: &FindOptions,
    ) -> Outcome<Option<Record>, Error> {
        let resolved = match self.metadata.expect(entity) {
            Ok(r) => r,
            Err(e) => return Outcome::Err(e),
        };
        for name in options.populated() {
            if resolved.relation(name).is_none() {
                return Outcome::Err(Error::Validation(ValidationError::new(
                    ValidationErrorKind::UnknownField,
                    entity,
                    name.clone(),
                    format!("entity {entity} has no relation {name}"),
                )));
            }
        }
        let projection = resolved.projection();
        let row = match self
            .backend
            .get_by_key(cx, &resolved.table, &resolved.primary_key, key, &projection)
            .await
        {
            Outcome::Ok(Some(row)) => row,
            Outcome::Ok(None) => return Outcome::Ok(None),
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        let mut record = Record::from_row(resolved, &row);
        for name in options.populated() {
            match self.populate_relation(cx, resolved, &record, name).await {
                Outcome::Ok(Some(related)) => record.attach(name.clone(), related),
                Outcome::Ok(None) => {}
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
        Outcome::Ok(Some(record))
    }

    /// Fetch the target of one relation by the record's foreign key value.
    async fn populate_relation(
        &self,
        cx: &Cx,
        resolved: &ResolvedEntity,
        record: &Record,
        name: &str,
    ) -> Outcome<Option<Record>, Error> {
        let Some(relation) = resolved.relation(name) else {
            return Outcome::Ok(None);
        };
        let fk = match record.get(&relation.fk_column) {
            Some(value) if !value.is_null() => value.clone(),
            _ => return Outcome::Ok(None),
        };
        let target = match self.metadata.expect(&relation.target) {
            Ok(t) => t,
            Err(e) => return Outcome::Err(e),
        };
        let projection: Vec<ComputedColumn> = target.projection();
        let row: Option<Row> = match self
            .backend
            .get_by_key(cx, &target.table, &target.primary_key, &fk, &projection)
            .await
        {
            Outcome::Ok(row) => row,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        Outcome::Ok(row.map(|r| Record::from_row(target, &r)))
    }

    /// Close the session and its connection.
    pub async fn close(self, cx: &Cx) -> Result<()> {
        tracing::debug!("Session closing");
        self.backend.close(cx).await
    }

    /// Borrow the underlying backend connection.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
