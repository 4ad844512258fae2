//! Storage backends for shortlink records.

pub mod memory;
pub mod sqlite;

pub use dwarf_core::repository::{ReadRepository, Repository, SequenceSource};
pub use dwarf_core::StorageError;
pub use memory::InMemoryRepository;
pub use sqlite::SqliteRepository;
