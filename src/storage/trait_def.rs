use crate::models::{ClickEvent, LinkRecord};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Unavailable(err.into())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Keyed storage for short links.
///
/// Implementations must make `try_insert` and `append_click` atomic: at most
/// one concurrent insert of a given code succeeds, and concurrent appends to
/// the same code never lose an event.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> StorageResult<()>;

    /// Insert `record` under `record.code` unless that code already exists,
    /// expired or not. Returns `false` on conflict without touching the
    /// existing record.
    async fn try_insert(&self, record: &LinkRecord) -> StorageResult<bool>;

    /// Get a link with its click history
    async fn get(&self, code: &str) -> StorageResult<Option<LinkRecord>>;

    /// All links, including expired ones
    async fn list_all(&self) -> StorageResult<Vec<LinkRecord>>;

    /// Append a click to an existing link. Returns `false` if the code is unknown.
    async fn append_click(&self, code: &str, event: &ClickEvent) -> StorageResult<bool>;

    /// Release backend resources. Called once at shutdown.
    async fn close(&self);
}
