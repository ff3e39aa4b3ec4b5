use crate::models::{ClickEvent, LinkRecord};
use crate::storage::rows::{assemble, to_millis, ClickRow, LinkRow};
use crate::storage::{LinkStore, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl LinkStore for PostgresStorage {
    async fn init(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                short_code TEXT PRIMARY KEY,
                original_url TEXT NOT NULL,
                created_at BIGINT NOT NULL,
                expires_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clicks (
                id BIGSERIAL PRIMARY KEY,
                short_code TEXT NOT NULL REFERENCES links(short_code),
                clicked_at BIGINT NOT NULL,
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
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (short_code) DO NOTHING
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
            WHERE short_code = $1
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
            WHERE short_code = $1
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
            SELECT $1::TEXT, $2::BIGINT, $3::TEXT, $4::TEXT
            WHERE EXISTS (SELECT 1 FROM links WHERE short_code = $1)
            "#,
        )
        .bind(code)
        .bind(to_millis(event.timestamp))
        .bind(&event.source)
        .bind(&event.location)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
