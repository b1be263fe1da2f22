//! Storage module for persisting crawl data
//!
//! This module handles everything the crawler writes to disk:
//! - The SQLite checkpoint database (frontier, URL sets, counters)
//! - The content-addressed page store and its hash ledger

mod page_store;
mod schema;
mod sqlite;
mod traits;

pub use page_store::{PageStore, SavedPage};
pub use sqlite::SqliteCheckpointStore;
pub use traits::{Checkpoint, CheckpointStore, StorageError, StorageResult};
