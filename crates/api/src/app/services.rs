//! Service wiring: pick the backing store and build the services on top of it.

use std::sync::Arc;

use anyhow::Context;

use storefront_infra::{
    db, migrations, AppConfig, CatalogRepository, CatalogService, InMemoryStore, OrderService,
    PostgresStore, ReservationConfig, Store, StoreBackend,
};

pub type SharedStore = Arc<dyn Store>;
pub type SharedCatalog = Arc<dyn CatalogRepository>;

/// Everything the handlers need. Built once at startup, shared by `Arc`.
pub struct AppServices {
    pub orders: OrderService<SharedStore>,
    pub catalog: CatalogService<SharedCatalog>,
}

impl AppServices {
    pub fn new<S>(store: S, reservation: ReservationConfig) -> Self
    where
        S: Store + CatalogRepository + Clone + 'static,
    {
        let orders: SharedStore = Arc::new(store.clone());
        let catalog: SharedCatalog = Arc::new(store);
        Self {
            orders: OrderService::with_config(orders, reservation),
            catalog: CatalogService::new(catalog),
        }
    }

    /// Services over a fresh in-memory store (dev/test).
    pub fn in_memory(reservation: ReservationConfig) -> Self {
        Self::new(InMemoryStore::new(), reservation)
    }
}

/// Build services for the configured backend.
///
/// For Postgres this connects the pool and applies pending migrations first.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.store {
        StoreBackend::InMemory => {
            tracing::warn!("no database configured; using in-memory stores (data is not persisted)");
            Ok(AppServices::in_memory(config.reservation))
        }
        StoreBackend::Postgres(db_config) => {
            let pool = db::connect_pool(db_config)
                .await
                .context("failed to connect to Postgres")?;
            let applied = migrations::run_migrations(&pool, &config.migrations_dir)
                .await
                .context("failed to apply migrations")?;
            tracing::info!(applied = applied.len(), "migrations up to date");
            Ok(AppServices::new(PostgresStore::new(pool), config.reservation))
        }
    }
}
