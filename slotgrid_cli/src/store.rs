use std::str::FromStr;

use slotgrid_core::{JsonFileStore, KeyValueStore, StoreError, StoreResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tokio::runtime::Runtime;
use tracing::info;

/// Player keys in a SQLite `kv` table. Queries run to completion on a
/// private current-thread runtime, so the round engine stays synchronous.
pub struct SqliteStore {
    pool: SqlitePool,
    rt: Runtime,
}

impl SqliteStore {
    pub fn connect(url: &str) -> anyhow::Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = rt.block_on(async {
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Ok::<_, anyhow::Error>(pool)
        })?;
        info!(url, "opened sqlite store");
        Ok(Self { pool, rt })
    }
}

const UPSERT: &str =
    "INSERT INTO kv (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value";

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.rt
            .block_on(
                sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE key = ?")
                    .bind(key)
                    .fetch_optional(&self.pool),
            )
            .map_err(backend)
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.rt
            .block_on(sqlx::query(UPSERT).bind(key).bind(value).execute(&self.pool))
            .map_err(backend)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        self.rt
            .block_on(sqlx::query("DELETE FROM kv WHERE key = ?").bind(key).execute(&self.pool))
            .map_err(backend)?;
        Ok(())
    }

    /// One transaction per batch.
    fn set_all(&mut self, entries: &[(&str, &str)]) -> StoreResult<()> {
        self.rt
            .block_on(async {
                let mut tx = self.pool.begin().await?;
                for &(key, value) in entries {
                    sqlx::query(UPSERT).bind(key).bind(value).execute(&mut *tx).await?;
                }
                tx.commit().await
            })
            .map_err(backend)
    }
}

/// `sqlite://...` opens SQLite, anything else is a JSON file path.
pub fn open_store(location: &str) -> anyhow::Result<Box<dyn KeyValueStore>> {
    if location.starts_with("sqlite:") {
        Ok(Box::new(SqliteStore::connect(location)?))
    } else {
        Ok(Box::new(JsonFileStore::open(location)?))
    }
}
