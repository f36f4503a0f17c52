//! Infrastructure layer: stores, order reservation, catalog service, config, DB wiring.

pub mod catalog;
pub mod config;
pub mod db;
pub mod migrations;
pub mod reservation;
pub mod store;

mod integration_tests;

pub use catalog::{CatalogError, CatalogService};
pub use config::{AppConfig, ConfigError, DatabaseConfig, StoreBackend};
pub use reservation::{OrderService, ReservationConfig};
pub use store::{CatalogRepository, InMemoryStore, PostgresStore, Store, StoreError, UnitOfWork};
