//! Entitykit - entity metadata resolution and persistence sessions.
//!
//! Entitykit turns a list of entity declarations into resolved persistence
//! metadata, then persists and fetches records through that metadata:
//!
//! - Single inheritance between declarations, with explicit registration
//! - Explicit table bindings plus a deterministic default naming scheme
//! - Computed fields evaluated by the storage engine on every read
//! - Many-to-one relations with populate and eager-join fetching
//! - Two disjoint failure classes: metadata errors before any statement is
//!   issued, storage errors only at an actual read or write
//!
//! # Quick Start
//!
//! ```
//! use entitykit::MemEngine;
//! use entitykit::prelude::*;
//!
//! let entities = vec![
//!     EntityDef::new("User")
//!         .table("user")
//!         .field(FieldDef::new("id", ColumnType::BigInt).primary_key(true))
//!         .field(FieldDef::new("first_name", ColumnType::Text))
//!         .field(FieldDef::new("last_name", ColumnType::Text))
//!         .computed(ComputedDef::new("full_name", "first_name || ' ' || last_name")),
//! ];
//!
//! let rt = asupersync::runtime::RuntimeBuilder::current_thread()
//!     .build()
//!     .unwrap();
//! let cx = Cx::for_testing();
//! rt.block_on(async {
//!     let engine = MemEngine::new();
//!     let conn = engine.connect(&ConnectConfig::new("app_test")).unwrap();
//!     let session = Session::open(&entities, conn).unwrap();
//!     let plan = SchemaPlan::from_entities(session.metadata());
//!     match plan.create_all(&cx, session.backend()).await {
//!         Outcome::Ok(_) => {}
//!         other => panic!("schema setup failed: {other:?}"),
//!     }
//!
//!     let user = session
//!         .create("User", &[
//!             ("id", 1.into()),
//!             ("first_name", "tony".into()),
//!             ("last_name", "soprano".into()),
//!         ])
//!         .unwrap();
//!     match session.persist_and_flush(&cx, &user).await {
//!         Outcome::Ok(()) => {}
//!         other => panic!("flush failed: {other:?}"),
//!     }
//! });
//! ```

// Re-export public types from sub-crates
pub use entitykit_core::{
    // asupersync re-exports
    Budget,
    ColumnInfo,
    ColumnSpec,
    ColumnType,
    ComputedColumn,
    ComputedDef,
    ConnectConfig,
    Cx,
    EntityDef,
    EntityMap,
    Error,
    FieldDef,
    Formula,
    FromValue,
    MetadataError,
    MetadataErrorKind,
    Outcome,
    Record,
    RegionId,
    RelationDef,
    ResolvedEntity,
    Result,
    Row,
    StorageError,
    StorageErrorKind,
    TableSpec,
    TaskId,
    ValidationError,
    ValidationErrorKind,
    Value,
};

pub use entitykit_core::Backend;
pub use entitykit_mem::{MemConnection, MemEngine};
pub use entitykit_query::QueryBuilder;
pub use entitykit_schema::{SchemaPlan, resolve};
pub use entitykit_session::{FindOptions, Session};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use entitykit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // asupersync
        Budget,
        ColumnType,
        ComputedDef,
        ConnectConfig,
        Cx,
        // Declarations
        EntityDef,
        EntityMap,
        Error,
        FieldDef,
        FindOptions,
        Outcome,
        // Query building
        QueryBuilder,
        Record,
        RegionId,
        RelationDef,
        Result,
        Row,
        // Schema
        SchemaPlan,
        // Session
        Session,
        TaskId,
        Value,
        resolve,
    };
}
