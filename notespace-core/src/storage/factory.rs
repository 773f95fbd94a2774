use std::sync::Arc;

use crate::config::schema::{Config, StorageBackendKind};
use crate::error::Result;
use crate::storage::memory::MemoryStorage;
use crate::storage::sqlite::SqliteStorage;
use crate::storage::StorageBackend;

pub fn create_storage_backend(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    match config.storage.backend {
        StorageBackendKind::Sqlite => {
            let backend = SqliteStorage::new(
                &config.storage.connection_string,
                config.storage.pool_size,
                config.storage.sqlite.clone(),
            )?;
            tracing::info!(
                connection = %config.storage.connection_string,
                pool_size = config.storage.pool_size,
                "using sqlite storage backend"
            );
            Ok(Arc::new(backend))
        }
        StorageBackendKind::Memory => {
            tracing::info!("using in-memory storage backend");
            Ok(Arc::new(MemoryStorage::new()))
        }
    }
}
