//! Short-code registry: link creation, resolution and statistics.

mod error;
mod service;

pub use error::{RegistryError, RegistryResult};
pub use service::RegistryService;
