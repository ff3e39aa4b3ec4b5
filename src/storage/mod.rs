pub mod memory;
pub mod postgres;
mod rows;
pub mod sqlite;
pub mod trait_def;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{LinkStore, StorageError, StorageResult};

use crate::config::{DatabaseBackend, DatabaseConfig};
use std::sync::Arc;
use tracing::info;

/// Open and initialize the configured backend.
pub async fn open_storage(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn LinkStore>> {
    let storage: Arc<dyn LinkStore> = match config.backend {
        DatabaseBackend::Memory => {
            info!("Using in-memory storage");
            Arc::new(MemoryStorage::new())
        }
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?)
        }
    };

    storage.init().await?;
    Ok(storage)
}
