//! Metadata resolution and schema planning for entitykit.
//!
//! The resolver is the heart of the crate: [`resolve`] turns a list of
//! entity declarations into an immutable [`EntityMap`](entitykit_core::EntityMap)
//! or fails with a [`MetadataError`](entitykit_core::MetadataError) before any
//! storage is touched. [`SchemaPlan`] derives physical table shapes from a
//! resolved map for fixture setup.
//!
//! # Example
//!
//! ```
//! use entitykit_core::{ColumnType, EntityDef, FieldDef};
//! use entitykit_schema::resolve;
//!
//! let user = EntityDef::new("User")
//!     .table("user")
//!     .field(FieldDef::new("id", ColumnType::BigInt).primary_key(true))
//!     .field(FieldDef::new("name", ColumnType::Text));
//! let map = resolve(&[user]).unwrap();
//! assert_eq!(map.expect("User").unwrap().table, "user");
//! ```

pub mod plan;
pub mod resolve;

pub use plan::SchemaPlan;
pub use resolve::resolve;
