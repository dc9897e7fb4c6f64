//! Storage layer
//!
//! Repositories over the persisted tables, backed by memory or SurrealDB.

pub mod factory;
pub mod memory;
pub mod repository;

#[cfg(feature = "surrealdb")]
pub mod surrealdb;

pub use factory::{StorageFactory, Tables};
pub use repository::{Filter, Order, Record, Repository};
