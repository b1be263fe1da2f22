//! SQLite checkpoint store
//!
//! Every save rewrites the whole checkpoint inside one transaction, so a crash
//! mid-save leaves the previous snapshot intact.

use crate::crawler::{FrontierEntry, FrontierSnapshot, Politeness};
use crate::state::{CrawlState, UrlStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Checkpoint, CheckpointStore, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite checkpoint backend
pub struct SqliteCheckpointStore {
    conn: Connection,
}

impl SqliteCheckpointStore {
    /// Opens (or creates) the checkpoint database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// When the stored checkpoint was written, if there is one
    pub fn saved_at(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT saved_at FROM crawl_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|s| parse_timestamp(&s)).transpose()
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn save(&mut self, checkpoint: &Checkpoint) -> StorageResult<()> {
        let state = &checkpoint.state;
        let frontier = &checkpoint.frontier;

        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "
            DELETE FROM crawl_meta;
            DELETE FROM pending;
            DELETE FROM url_sets;
            DELETE FROM url_hashes;
        ",
        )?;

        tx.execute(
            "INSERT INTO crawl_meta
             (id, iteration, crawl_delay, too_many_requests_count, success_count,
              last_delay_adjustment, reorder_interval, next_reorder_iteration,
              total_bytes_crawled, bytes_at_last_save, saved_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                to_db_int(state.iteration),
                state.politeness.crawl_delay,
                state.politeness.too_many_requests_count,
                state.politeness.success_count,
                state.politeness.last_adjustment.to_rfc3339(),
                to_db_int(state.reorder_interval),
                to_db_int(state.next_reorder_iteration),
                to_db_int(state.total_bytes_crawled),
                to_db_int(state.bytes_at_last_save),
                Utc::now().to_rfc3339(),
            ],
        )?;

        {
            let mut insert_pending = tx.prepare(
                "INSERT INTO pending (position, url, retry_count) VALUES (?1, ?2, ?3)",
            )?;
            for (position, entry) in frontier.pending.iter().enumerate() {
                insert_pending.execute(params![
                    to_db_int(position as u64),
                    entry.url,
                    entry.retry_count
                ])?;
            }

            let mut insert_url =
                tx.prepare("INSERT OR IGNORE INTO url_sets (url, status) VALUES (?1, ?2)")?;
            for (url, status) in frontier.url_statuses() {
                insert_url.execute(params![url, status.to_db_string()])?;
            }

            let mut insert_hash =
                tx.prepare("INSERT INTO url_hashes (hash, url) VALUES (?1, ?2)")?;
            for (hash, url) in &state.url_hashes {
                insert_hash.execute(params![hash, url])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn load(&self) -> StorageResult<Option<Checkpoint>> {
        let meta = self
            .conn
            .query_row(
                "SELECT iteration, crawl_delay, too_many_requests_count, success_count,
                        last_delay_adjustment, reorder_interval, next_reorder_iteration,
                        total_bytes_crawled, bytes_at_last_save
                 FROM crawl_meta WHERE id = 1",
                [],
                |row| {
                    Ok(MetaRow {
                        iteration: row.get(0)?,
                        crawl_delay: row.get(1)?,
                        too_many_requests_count: row.get(2)?,
                        success_count: row.get(3)?,
                        last_delay_adjustment: row.get(4)?,
                        reorder_interval: row.get(5)?,
                        next_reorder_iteration: row.get(6)?,
                        total_bytes_crawled: row.get(7)?,
                        bytes_at_last_save: row.get(8)?,
                    })
                },
            )
            .optional()?;

        let Some(meta) = meta else {
            return Ok(None);
        };

        let mut frontier = FrontierSnapshot::default();

        let mut stmt = self
            .conn
            .prepare("SELECT url, retry_count FROM pending ORDER BY position")?;
        let rows = stmt.query_map([], |row| {
            Ok(FrontierEntry {
                url: row.get(0)?,
                retry_count: row.get(1)?,
            })
        })?;
        for entry in rows {
            frontier.pending.push(entry?);
        }

        let mut stmt = self.conn.prepare("SELECT url, status FROM url_sets")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (url, status) = row?;
            let status = UrlStatus::from_db_string(&status).ok_or_else(|| {
                StorageError::CorruptCheckpoint(format!("unknown URL status '{}'", status))
            })?;
            frontier.insert_status(url, status);
        }

        let mut url_hashes = BTreeMap::new();
        let mut stmt = self.conn.prepare("SELECT hash, url FROM url_hashes")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (hash, url) = row?;
            url_hashes.insert(hash, url);
        }

        let state = CrawlState {
            iteration: from_db_int(meta.iteration, "iteration")?,
            politeness: Politeness {
                crawl_delay: meta.crawl_delay,
                too_many_requests_count: meta.too_many_requests_count,
                success_count: meta.success_count,
                last_adjustment: parse_timestamp(&meta.last_delay_adjustment)?,
            },
            reorder_interval: from_db_int(meta.reorder_interval, "reorder_interval")?,
            next_reorder_iteration: from_db_int(
                meta.next_reorder_iteration,
                "next_reorder_iteration",
            )?,
            url_hashes,
            total_bytes_crawled: from_db_int(meta.total_bytes_crawled, "total_bytes_crawled")?,
            bytes_at_last_save: from_db_int(meta.bytes_at_last_save, "bytes_at_last_save")?,
        };

        Ok(Some(Checkpoint { state, frontier }))
    }

    fn clear(&mut self) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "
            DELETE FROM crawl_meta;
            DELETE FROM pending;
            DELETE FROM url_sets;
            DELETE FROM url_hashes;
        ",
        )?;
        tx.commit()?;
        Ok(())
    }
}

struct MetaRow {
    iteration: i64,
    crawl_delay: f64,
    too_many_requests_count: u32,
    success_count: u32,
    last_delay_adjustment: String,
    reorder_interval: i64,
    next_reorder_iteration: i64,
    total_bytes_crawled: i64,
    bytes_at_last_save: i64,
}

fn to_db_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_db_int(value: i64, column: &str) -> StorageResult<u64> {
    u64::try_from(value).map_err(|_| {
        StorageError::CorruptCheckpoint(format!("negative value {} in {}", value, column))
    })
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptCheckpoint(format!("bad timestamp '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn create_checkpoint() -> Checkpoint {
        let adjusted = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut url_hashes = BTreeMap::new();
        url_hashes.insert("ab12".to_string(), "https://example.org/product/1".to_string());

        let state = CrawlState {
            iteration: 42,
            politeness: Politeness {
                crawl_delay: 6.25,
                too_many_requests_count: 1,
                success_count: 7,
                last_adjustment: adjusted,
            },
            reorder_interval: 12,
            next_reorder_iteration: 54,
            url_hashes,
            total_bytes_crawled: 2048,
            bytes_at_last_save: 1024,
        };

        let frontier = FrontierSnapshot {
            pending: vec![
                FrontierEntry {
                    url: "https://example.org/b".to_string(),
                    retry_count: 2,
                },
                FrontierEntry::new("https://example.org/a"),
            ],
            visited: BTreeSet::from(["https://example.org/product/1".to_string()]),
            failed: BTreeSet::from(["https://example.org/broken".to_string()]),
            never_crawl: BTreeSet::from(["https://example.org/gone".to_string()]),
        };

        Checkpoint { state, frontier }
    }

    #[test]
    fn test_load_empty() {
        let store = SqliteCheckpointStore::new_in_memory().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(store.saved_at().unwrap().is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        let checkpoint = create_checkpoint();

        store.save(&checkpoint).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded, checkpoint);
        assert!(store.saved_at().unwrap().is_some());
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        let mut checkpoint = create_checkpoint();
        store.save(&checkpoint).unwrap();

        checkpoint.state.iteration = 100;
        checkpoint.frontier.pending.truncate(1);
        checkpoint.frontier.failed.clear();
        store.save(&checkpoint).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.state.iteration, 100);
        assert_eq!(loaded.frontier.pending.len(), 1);
        assert!(loaded.frontier.failed.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        store.save(&create_checkpoint()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_status_reported() {
        let mut store = SqliteCheckpointStore::new_in_memory().unwrap();
        store.save(&create_checkpoint()).unwrap();
        store
            .conn
            .execute(
                "INSERT INTO url_sets (url, status) VALUES ('https://example.org/x', 'bogus')",
                [],
            )
            .unwrap();

        assert!(matches!(
            store.load(),
            Err(StorageError::CorruptCheckpoint(_))
        ));
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        let checkpoint = create_checkpoint();

        {
            let mut store = SqliteCheckpointStore::new(&path).unwrap();
            store.save(&checkpoint).unwrap();
        }

        let store = SqliteCheckpointStore::new(&path).unwrap();
        assert_eq!(store.load().unwrap(), Some(checkpoint));
    }
}
