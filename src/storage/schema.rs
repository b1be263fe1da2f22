//! Database schema definitions
//!
//! This module contains the SQL schema of the checkpoint database.

/// SQL schema for the checkpoint database
pub const SCHEMA_SQL: &str = r#"
-- Crawl counters and politeness state (at most one row)
CREATE TABLE IF NOT EXISTS crawl_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    iteration INTEGER NOT NULL,
    crawl_delay REAL NOT NULL,
    too_many_requests_count INTEGER NOT NULL,
    success_count INTEGER NOT NULL,
    last_delay_adjustment TEXT NOT NULL,
    reorder_interval INTEGER NOT NULL,
    next_reorder_iteration INTEGER NOT NULL,
    total_bytes_crawled INTEGER NOT NULL,
    bytes_at_last_save INTEGER NOT NULL,
    saved_at TEXT NOT NULL
);

-- Pending frontier entries in queue order
CREATE TABLE IF NOT EXISTS pending (
    position INTEGER PRIMARY KEY,
    url TEXT NOT NULL,
    retry_count INTEGER NOT NULL
);

-- Visited, failed and never-crawl sets
CREATE TABLE IF NOT EXISTS url_sets (
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    PRIMARY KEY (url, status)
);

CREATE INDEX IF NOT EXISTS idx_url_sets_status ON url_sets(status);

-- Page store hash -> URL
CREATE TABLE IF NOT EXISTS url_hashes (
    hash TEXT PRIMARY KEY,
    url TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
