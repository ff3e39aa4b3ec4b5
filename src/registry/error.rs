use crate::storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("short code '{0}' already exists")]
    CodeConflict(String),
    #[error("failed to generate a unique short code after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("short code '{0}' not found")]
    NotFound(String),
    #[error("short code '{0}' has expired")]
    Expired(String),
    #[error(transparent)]
    StorageUnavailable(#[from] StorageError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
