use std::sync::Arc;

use crate::config::ServerConfig;
use crate::storage::FileStorage;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: projectflow_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Uploaded file storage rooted at `config.upload_path`.
    pub storage: Arc<FileStorage>,
}

impl AppState {
    pub fn new(pool: projectflow_db::DbPool, config: ServerConfig) -> Self {
        let storage = FileStorage::new(config.upload_path.clone());
        Self {
            pool,
            config: Arc::new(config),
            storage: Arc::new(storage),
        }
    }
}
