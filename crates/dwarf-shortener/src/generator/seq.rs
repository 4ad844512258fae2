use crate::generator::Generator;
use async_trait::async_trait;
use dwarf_core::{ShortCode, StorageError};
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic generator for tests.
///
/// Codes are the base62 encoding of an in-process counter starting at zero
/// (`@0`, `@1`, ... `@z`, `@A`, ... `@10`). Nothing coordinates it with the
/// store, so services backed by a shared or persistent store use
/// [`StoreGenerator`](super::store::StoreGenerator) instead.
#[derive(Debug, Default)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl SeqGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Generator for SeqGenerator {
    async fn generate(&self) -> Result<ShortCode, StorageError> {
        let sequence = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ShortCode::generated(sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seq_generator_produces_sequential_codes() {
        let generator = SeqGenerator::new();

        assert_eq!(generator.generate().await.unwrap().as_str(), "@0");
        assert_eq!(generator.generate().await.unwrap().as_str(), "@1");
        assert_eq!(generator.generate().await.unwrap().as_str(), "@2");
    }

    #[tokio::test]
    async fn codes_are_generated() {
        let generator = SeqGenerator::new();

        assert!(generator.generate().await.unwrap().is_generated());
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqGenerator>();
    }
}
