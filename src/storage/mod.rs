//! Storage Layer Module
//!
//! Persists the bridge state the core components journal.
//!
//! This module contains:
//! - Storage trait definitions for abstraction
//! - SQLite implementation for production
//! - In-memory implementation for testing

pub mod memory;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience
pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;
pub use traits::{Record, Snapshot, StateStore, StorageError, StorageResult};
