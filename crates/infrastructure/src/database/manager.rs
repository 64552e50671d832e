use std::sync::Arc;

use dispatch_config::DatabaseConfig;
use dispatch_core::{
    traits::{CourierRepository, DeliveryRepository},
    DispatchResult,
};
use tracing::info;

use super::memory::MemoryStore;
use super::postgres::{
    connect_pool, run_migrations, PostgresCourierRepository, PostgresDeliveryRepository,
};

/// Storage backend selected from the database URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    PostgreSQL,
    Memory,
}

impl DatabaseType {
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseType::PostgreSQL
        } else {
            DatabaseType::Memory
        }
    }
}

enum Backend {
    PostgreSQL(sqlx::PgPool),
    Memory(MemoryStore),
}

/// Owns the storage backend and hands out repositories over it.
pub struct DatabaseManager {
    backend: Backend,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> DispatchResult<Self> {
        let backend = match DatabaseType::from_url(&config.url) {
            DatabaseType::PostgreSQL => {
                let pool = connect_pool(config).await?;
                if config.run_migrations {
                    run_migrations(&pool).await?;
                }
                Backend::PostgreSQL(pool)
            }
            DatabaseType::Memory => {
                info!("using in-memory storage");
                Backend::Memory(MemoryStore::new())
            }
        };
        Ok(Self { backend })
    }

    /// Wrap an existing in-memory store, sharing its data.
    pub fn from_memory(store: MemoryStore) -> Self {
        Self {
            backend: Backend::Memory(store),
        }
    }

    pub fn database_type(&self) -> DatabaseType {
        match self.backend {
            Backend::PostgreSQL(_) => DatabaseType::PostgreSQL,
            Backend::Memory(_) => DatabaseType::Memory,
        }
    }

    pub async fn health_check(&self) -> DispatchResult<()> {
        if let Backend::PostgreSQL(pool) = &self.backend {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        if let Backend::PostgreSQL(pool) = &self.backend {
            pool.close().await;
        }
    }

    pub fn courier_repository(&self) -> Arc<dyn CourierRepository> {
        match &self.backend {
            Backend::PostgreSQL(pool) => Arc::new(PostgresCourierRepository::new(pool.clone())),
            Backend::Memory(store) => Arc::new(store.courier_repository()),
        }
    }

    pub fn delivery_repository(&self) -> Arc<dyn DeliveryRepository> {
        match &self.backend {
            Backend::PostgreSQL(pool) => Arc::new(PostgresDeliveryRepository::new(pool.clone())),
            Backend::Memory(store) => Arc::new(store.delivery_repository()),
        }
    }
}
