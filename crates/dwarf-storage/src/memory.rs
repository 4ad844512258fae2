use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dwarf_core::repository::{ReadRepository, Repository, Result, SequenceSource};
use dwarf_core::{ShortCode, ShortlinkRecord, StorageError};
use jiff::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of the Repository trait using DashMap.
///
/// Every mutation goes through the entry API, so the shard lock for a key is
/// held across the whole check-and-modify step. Operations on codes in
/// different shards never contend.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    storage: DashMap<String, ShortlinkRecord>,
    sequence: AtomicU64,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
            sequence: AtomicU64::new(0),
        }
    }

    /// Number of stored records, including ones not yet lazily evicted.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortlinkRecord>> {
        Ok(self
            .storage
            .get(code.as_str())
            .map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, code: &ShortCode, record: ShortlinkRecord, now: Timestamp) -> Result<()> {
        match self.storage.entry(code.as_str().to_owned()) {
            Entry::Vacant(vacant) => {
                vacant.insert(record);
                Ok(())
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    return Err(StorageError::Conflict(code.to_string()));
                }
                // The previous holder is expired or used up.
                occupied.insert(record);
                Ok(())
            }
        }
    }

    async fn decrement_uses(
        &self,
        code: &ShortCode,
        now: Timestamp,
    ) -> Result<Option<ShortlinkRecord>> {
        let Entry::Occupied(mut occupied) = self.storage.entry(code.as_str().to_owned()) else {
            return Ok(None);
        };

        if !occupied.get().is_live(now) {
            return Ok(None);
        }

        match occupied.get().uses_remaining {
            None => Ok(Some(occupied.get().clone())),
            Some(1) => {
                let mut last = occupied.remove();
                last.uses_remaining = Some(0);
                Ok(Some(last))
            }
            Some(n) => {
                let record = occupied.get_mut();
                record.uses_remaining = Some(n.saturating_sub(1));
                Ok(Some(record.clone()))
            }
        }
    }

    async fn evict(&self, code: &ShortCode, now: Timestamp) -> Result<bool> {
        Ok(self
            .storage
            .remove_if(code.as_str(), |_, record| !record.is_live(now))
            .is_some())
    }

    async fn delete(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.storage.remove(code.as_str()).is_some())
    }
}

#[async_trait]
impl SequenceSource for InMemoryRepository {
    async fn next_sequence(&self) -> Result<u64> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst))
    }
}
