use crate::generator::Generator;
use async_trait::async_trait;
use dwarf_core::{SequenceSource, ShortCode, StorageError};
use std::sync::Arc;

/// Generator backed by a store's own allocation counter.
///
/// The counter lives next to the records, so codes stay unique across
/// processes and restarts.
#[derive(Debug)]
pub struct StoreGenerator<S> {
    source: Arc<S>,
}

impl<S> Clone for StoreGenerator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: SequenceSource> StoreGenerator<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: SequenceSource> Generator for StoreGenerator<S> {
    async fn generate(&self) -> Result<ShortCode, StorageError> {
        let sequence = self.source.next_sequence().await?;
        Ok(ShortCode::generated(sequence))
    }
}
