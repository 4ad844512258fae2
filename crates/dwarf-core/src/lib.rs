//! Core types and traits for the dwarf URL shortener.
//!
//! This crate holds the shortlink data model, the eviction policy, the
//! passphrase codec and the store/orchestrator traits shared by the storage
//! backends and the shortener service.

pub mod base62;
pub mod cipher;
pub mod clock;
pub mod error;
pub mod eviction;
pub mod record;
pub mod repository;
pub mod shortcode;
pub mod shortener;

pub use cipher::EncryptedPayload;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CipherError, CoreError, ShortenerError, StorageError};
pub use eviction::Verdict;
pub use record::{ShortlinkRecord, Target};
pub use repository::{ReadRepository, Repository, SequenceSource};
pub use shortcode::ShortCode;
pub use shortener::{CreateParams, ExpirationPolicy, Shortener};
