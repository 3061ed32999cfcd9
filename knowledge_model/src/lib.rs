//! # Knowledge Model
//!
//! Shared value types for the knowledge engine: typed knowledge nodes, the
//! relations between them, and the filter/result types used by queries.
//! This crate is the single source of truth for the entity model and performs
//! no I/O.

pub mod error;
pub mod node;
pub mod query;
pub mod relation;

pub use error::*;
pub use node::*;
pub use query::*;
pub use relation::*;
