use crate::error::StorageError;
use crate::record::ShortlinkRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A read-only view of a repository.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the record for a given short code, whatever its eviction
    /// state. Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortlinkRecord>>;
}

/// Mutating record store operations.
///
/// Every method is atomic with respect to all others on the same code.
#[async_trait]
pub trait Repository: ReadRepository {
    /// Inserts a new record in a single check-and-insert step.
    ///
    /// Returns `Err(Conflict)` if a record that is still live at `now` holds
    /// the code. A stored record that is expired or exhausted is replaced.
    async fn insert(&self, code: &ShortCode, record: ShortlinkRecord, now: Timestamp) -> Result<()>;

    /// Consumes one use of the record if it is still live at `now`.
    ///
    /// Returns the record as left by this call, deleting it in the same step
    /// when its count reaches zero, so callers resolve from the very record
    /// whose use they took. A record without a use limit is returned
    /// untouched. Returns `None` if the code is missing or its record is no
    /// longer live; such a record is left for [`Repository::evict`].
    async fn decrement_uses(
        &self,
        code: &ShortCode,
        now: Timestamp,
    ) -> Result<Option<ShortlinkRecord>>;

    /// Deletes the record only if it is expired or exhausted at `now`.
    ///
    /// A live record that replaced the one a caller saw is left alone.
    /// Returns `true` if a record was removed.
    async fn evict(&self, code: &ShortCode, now: Timestamp) -> Result<bool>;

    /// Deletes the record for a given short code.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &ShortCode) -> Result<bool>;
}

/// An atomic counter handing out allocation sequence numbers.
///
/// Each call returns a value no other call ever returned, including calls
/// from concurrent tasks or other processes sharing the same store.
#[async_trait]
pub trait SequenceSource: Send + Sync + 'static {
    async fn next_sequence(&self) -> Result<u64>;
}
