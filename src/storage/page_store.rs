//! Content-addressed page store
//!
//! Each fetched page is written to `<data_dir>/<sha256(url)>.html`, and every
//! newly written page appends one `hash<TAB>url` line to the ledger file.

use crate::storage::traits::StorageResult;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const PAGE_EXTENSION: &str = "html";

/// Result of [`PageStore::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPage {
    /// Lowercase hex SHA-256 of the URL
    pub url_hash: String,
    /// Bytes written (0 when the page already existed)
    pub bytes: u64,
    /// Whether this call created the file
    pub newly_saved: bool,
}

/// Page files plus the hash ledger
#[derive(Debug, Clone)]
pub struct PageStore {
    data_dir: PathBuf,
    ledger_path: PathBuf,
}

impl PageStore {
    /// Opens the store, creating the data directory if needed
    pub fn open(data_dir: &Path, ledger_path: &Path) -> StorageResult<Self> {
        fs::create_dir_all(data_dir)?;
        if let Some(parent) = ledger_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            ledger_path: ledger_path.to_path_buf(),
        })
    }

    /// Hex SHA-256 of a URL, used as the page file name
    ///
    /// # Example
    ///
    /// ```
    /// use forage::storage::PageStore;
    ///
    /// let hash = PageStore::url_hash("https://example.org");
    /// assert_eq!(hash.len(), 64);
    /// ```
    pub fn url_hash(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    /// Path of the page file for a hash
    pub fn page_path(&self, url_hash: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", url_hash, PAGE_EXTENSION))
    }

    /// Writes a page and records it in the ledger
    ///
    /// Saving a URL whose file already exists leaves the file and the ledger
    /// untouched; the anomaly is logged at error level.
    pub fn save(&self, url: &str, content: &str) -> StorageResult<SavedPage> {
        let url_hash = Self::url_hash(url);
        let path = self.page_path(&url_hash);

        if path.exists() {
            tracing::error!(url = %url, hash = %url_hash, "Page already saved, skipping re-save");
            return Ok(SavedPage {
                url_hash,
                bytes: 0,
                newly_saved: false,
            });
        }

        fs::write(&path, content.as_bytes())?;

        let mut ledger = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)?;
        writeln!(ledger, "{}\t{}", url_hash, url)?;

        tracing::debug!(url = %url, hash = %url_hash, bytes = content.len(), "Saved page");
        Ok(SavedPage {
            url_hash,
            bytes: content.len() as u64,
            newly_saved: true,
        })
    }

    /// Sum of the sizes of every page file
    pub fn total_bytes(&self) -> StorageResult<u64> {
        let mut total = 0;
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(PAGE_EXTENSION) {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }

    /// Number of page files in the store
    pub fn page_count(&self) -> StorageResult<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.data_dir)? {
            if entry?.path().extension().and_then(|e| e.to_str()) == Some(PAGE_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, PageStore) {
        let dir = TempDir::new().unwrap();
        let store = PageStore::open(&dir.path().join("data"), &dir.path().join("hashes.txt")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_url_hash_is_sha256_hex() {
        assert_eq!(
            PageStore::url_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        let hash = PageStore::url_hash("https://example.org/product/1");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_save_writes_file_and_ledger() {
        let (_dir, store) = open_store();
        let url = "https://example.org/product/1";

        let saved = store.save(url, "<p>hello</p>").unwrap();
        assert!(saved.newly_saved);
        assert_eq!(saved.bytes, 12);

        let content = fs::read_to_string(store.page_path(&saved.url_hash)).unwrap();
        assert_eq!(content, "<p>hello</p>");

        let ledger = fs::read_to_string(store.ledger_path()).unwrap();
        assert_eq!(ledger, format!("{}\t{}\n", saved.url_hash, url));
    }

    #[test]
    fn test_resave_is_not_an_error() {
        let (_dir, store) = open_store();
        let url = "https://example.org/a";

        store.save(url, "first").unwrap();
        let again = store.save(url, "second version").unwrap();
        assert!(!again.newly_saved);
        assert_eq!(again.bytes, 0);

        let content = fs::read_to_string(store.page_path(&again.url_hash)).unwrap();
        assert_eq!(content, "first");
        let ledger = fs::read_to_string(store.ledger_path()).unwrap();
        assert_eq!(ledger.lines().count(), 1);
    }

    #[test]
    fn test_total_bytes_counts_page_files_only() {
        let (dir, store) = open_store();
        store.save("https://example.org/a", "12345").unwrap();
        store.save("https://example.org/b", "123").unwrap();
        fs::write(dir.path().join("data").join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.total_bytes().unwrap(), 8);
        assert_eq!(store.page_count().unwrap(), 2);
    }
}
