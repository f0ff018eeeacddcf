//! In-memory storage engine for entitykit.
//!
//! Implements the [`Backend`](entitykit_core::Backend) trait over shared
//! process-local tables. Intended for tests and examples, but behaves like a
//! real engine: it enforces table existence, column shapes, nullability,
//! primary key uniqueness, and evaluates read-time formula projections.

pub mod engine;

pub use engine::{MemConnection, MemEngine};
