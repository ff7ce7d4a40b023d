//! Storage module for annotation persistence
//!
//! Supports an in-memory backend and a directory of JSON files.

mod backends;
mod records;

pub use backends::{open_backend, FilePersistence, MemoryPersistence, PersistenceAdapter};
pub use records::{load_records, save_records, storage_key_for, DEFAULT_STORAGE_KEY};
