//! Persistence boundary: units of work for order reservation plus catalog
//! point operations, with Postgres and in-memory implementations.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryStore, InMemoryUnitOfWork};
pub use postgres::{PostgresStore, PostgresUnitOfWork};
pub use r#trait::{
    CatalogRepository, OrderHeader, ProductSnapshot, Store, StoreError, UnitOfWork,
};
