use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::repository::ChatRepository;

/// Read-only handle on the bridge's message store.
///
/// Open once at startup, hand repositories to callers, and `close` on shutdown.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        info!("Opening message store: {}", config.db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .connect_with(options)
            .await
            .map_err(Error::retrieval("open the message store"))?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool, e.g. one shared with another component.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn repository(&self) -> ChatRepository {
        ChatRepository::new(self.pool.clone())
    }

    pub async fn close(self) {
        self.pool.close().await;
        info!("Message store closed");
    }
}
