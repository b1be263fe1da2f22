//! Storage traits and error types
//!
//! This module defines the checkpoint store interface and the errors shared
//! by the checkpoint store and the page store.

use crate::crawler::FrontierSnapshot;
use crate::state::CrawlState;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt checkpoint: {0}")]
    CorruptCheckpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Everything needed to resume a crawl
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub state: CrawlState,
    pub frontier: FrontierSnapshot,
}

/// Trait for checkpoint backends
///
/// A save replaces the previous snapshot as a whole: a reader observes either
/// the old checkpoint or the new one, never a mix of both.
pub trait CheckpointStore {
    /// Atomically replaces the stored checkpoint
    fn save(&mut self, checkpoint: &Checkpoint) -> StorageResult<()>;

    /// Loads the stored checkpoint
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Checkpoint))` - A snapshot exists
    /// * `Ok(None)` - Nothing has been saved yet
    fn load(&self) -> StorageResult<Option<Checkpoint>>;

    /// Removes the stored checkpoint
    fn clear(&mut self) -> StorageResult<()>;
}
