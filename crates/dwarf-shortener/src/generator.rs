pub mod seq;
pub mod store;

use async_trait::async_trait;
use dwarf_core::{ShortCode, StorageError};

/// Trait for allocating generated short codes.
///
/// Every call must draw a fresh value from an atomic counter. Implementations
/// never read a maximum and increment it in a separate step.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    /// Allocates the next generated short code.
    async fn generate(&self) -> Result<ShortCode, StorageError>;
}
