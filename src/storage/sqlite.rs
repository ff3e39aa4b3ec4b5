use crate::models::{ClickEvent, LinkRecord};
use crate::storage::rows::{assemble, to_millis, ClickRow, LinkRow};
use crate::storage::{LinkStore, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl LinkStore for SqliteStorage {
    async fn init(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                short_code TEXT PRIMARY KEY NOT NULL,
                original_url TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clicks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                short_code TEXT NOT NULL REFERENCES links(short_code),
                clicked_at INTEGER NOT NULL,
                source TEXT NOT NULL,
                location TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_clicks_short_code ON clicks(short_code)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn try_insert(&self, record: &LinkRecord) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (short_code, original_url, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(short_code) DO NOTHING
            "#,
        )
        .bind(&record.code)
        .bind(&record.original_url)
        .bind(to_millis(record.created_at))
        .bind(to_millis(record.expires_at))
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn get(&self, code: &str) -> StorageResult<Option<LinkRecord>> {
        let link = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT short_code, original_url, created_at, expires_at
            FROM links
            WHERE short_code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        let Some(link) = link else {
            return Ok(None);
        };

        let clicks = sqlx::query_as::<_, ClickRow>(
            r#"
            SELECT short_code, clicked_at, source, location
            FROM clicks
            WHERE short_code = ?
            ORDER BY id ASC
            "#,
        )
        .bind(code)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(assemble(vec![link], clicks)?.pop())
    }

    async fn list_all(&self) -> StorageResult<Vec<LinkRecord>> {
        let links = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT short_code, original_url, created_at, expires_at
            FROM links
            ORDER BY created_at ASC, short_code ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        let clicks = sqlx::query_as::<_, ClickRow>(
            r#"
            SELECT short_code, clicked_at, source, location
            FROM clicks
            ORDER BY id ASC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        assemble(links, clicks)
    }

    async fn append_click(&self, code: &str, event: &ClickEvent) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO clicks (short_code, clicked_at, source, location)
            SELECT ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM links WHERE short_code = ?)
            "#,
        )
        .bind(code)
        .bind(to_millis(event.timestamp))
        .bind(&event.source)
        .bind(&event.location)
        .bind(code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    async fn setup() -> SqliteStorage {
        let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        storage.init().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let storage = setup().await;
        storage.init().await.unwrap();
        assert!(storage.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timestamps_survive_round_trip() {
        let storage = setup().await;
        let created = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let record = LinkRecord::new("millis", "https://example.com", created, 5).unwrap();
        assert!(storage.try_insert(&record).await.unwrap());

        let stored = storage.get("millis").await.unwrap().unwrap();
        assert_eq!(stored.created_at, created);
        assert_eq!(stored.expires_at, record.expires_at);
        assert!(stored.clicks.is_empty());
    }
}
