//! Import bookmarks from a JSON export into the combined index.
//!
//! Expected shape: `{ "bookmarks": [ { "url": ..., "title": ..., "description": ...,
//! "tags": [...], "created_at": <unix seconds> }, ... ] }`. A missing or null
//! `created_at` is stored as 0.

use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::models::{Bookmark, BookmarkStatus, bookmark_id, now_unix};
use crate::store::{COMBINED_INDEX, COMBINED_URLS, RecordStore, StoreError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no bookmarks found in file")]
    Empty,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub imported: usize,
    /// Already present in the combined URL set, or repeated within the file.
    pub duplicates: usize,
    /// Empty or non-http(s) URLs, or entries that are not objects.
    pub invalid: usize,
}

#[derive(Debug, Deserialize)]
struct ImportFile {
    #[serde(default)]
    bookmarks: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ImportEntry {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    created_at: Option<i64>,
}

pub struct Importer {
    store: Arc<dyn RecordStore>,
}

impl Importer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn import_file<P: AsRef<Path>>(&self, path: P) -> Result<ImportSummary, ImportError> {
        let data = tokio::fs::read(path.as_ref()).await?;
        self.import_json(&data).await
    }

    /// Uniqueness is decided by adding the URL to the combined URL set first.
    #[tracing::instrument(skip_all, fields(bytes = data.len()))]
    pub async fn import_json(&self, data: &[u8]) -> Result<ImportSummary, ImportError> {
        let file: ImportFile = serde_json::from_slice(data)?;
        if file.bookmarks.is_empty() {
            return Err(ImportError::Empty);
        }

        let now = now_unix();
        let mut summary = ImportSummary::default();

        for raw in file.bookmarks {
            let Some(bookmark) = to_bookmark(raw, now) else {
                summary.invalid += 1;
                continue;
            };

            if !self.store.add_to_set(COMBINED_URLS, &bookmark.url).await? {
                summary.duplicates += 1;
                continue;
            }

            let member = bookmark.to_member().map_err(StoreError::from)?;
            self.store
                .add_to_sorted_index(COMBINED_INDEX, bookmark.score(), &member)
                .await?;
            summary.imported += 1;
        }

        tracing::info!(?summary, "import finished");
        Ok(summary)
    }
}

fn to_bookmark(raw: serde_json::Value, now: i64) -> Option<Bookmark> {
    let entry: ImportEntry = serde_json::from_value(raw).ok()?;
    let url = entry.url.trim().to_string();
    if !is_http_url(&url) {
        return None;
    }

    let id = bookmark_id(&url);
    Some(Bookmark {
        url,
        title: entry.title.trim().to_string(),
        description: entry.description,
        tags: entry.tags.unwrap_or_default(),
        created_at: entry.created_at.unwrap_or(0),
        updated_at: now,
        id,
        status: BookmarkStatus::Unknown,
    })
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, load_bookmarks};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "bookmarks": [
            {"url": "https://rust-lang.org", "title": "Rust", "tags": ["lang"], "created_at": 100},
            {"url": "https://redis.io", "title": "Redis", "description": "kv", "created_at": 50},
            {"url": "https://rust-lang.org", "title": "Rust again", "created_at": 200},
            {"url": "javascript:void(0)", "title": "bookmarklet"},
            {"url": "", "title": "empty"},
            "not an object"
        ]
    }"#;

    #[tokio::test]
    async fn test_import_dedupes_and_validates() {
        let store = Arc::new(MemoryStore::new());
        let importer = Importer::new(store.clone());

        let summary = importer.import_json(SAMPLE.as_bytes()).await.unwrap();
        assert_eq!(
            summary,
            ImportSummary { imported: 2, duplicates: 1, invalid: 3 }
        );

        let stored = load_bookmarks(&*store, COMBINED_INDEX).await.unwrap();
        let urls: Vec<&str> = stored.iter().map(|b| b.url.as_str()).collect();
        assert_eq!(urls, vec!["https://redis.io", "https://rust-lang.org"]);
        assert_eq!(stored[1].title, "Rust");
        assert_eq!(stored[1].tags, vec!["lang"]);
        assert_eq!(stored[1].id, bookmark_id("https://rust-lang.org"));
        assert_eq!(stored[1].status, BookmarkStatus::Unknown);
    }

    #[tokio::test]
    async fn test_missing_created_at_is_zero() {
        let store = Arc::new(MemoryStore::new());
        let export = br#"{"bookmarks": [
            {"url": "https://undated.example", "title": "undated"},
            {"url": "https://null.example", "title": "null", "created_at": null}
        ]}"#;
        Importer::new(store.clone()).import_json(export).await.unwrap();

        let stored = load_bookmarks(&*store, COMBINED_INDEX).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|b| b.created_at == 0));
        assert!(stored.iter().all(|b| b.updated_at > 0));
    }

    #[tokio::test]
    async fn test_second_import_skips_everything() {
        let store = Arc::new(MemoryStore::new());
        let importer = Importer::new(store.clone());
        importer.import_json(SAMPLE.as_bytes()).await.unwrap();

        let again = importer.import_json(SAMPLE.as_bytes()).await.unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.duplicates, 3);
        assert_eq!(store.index_len(COMBINED_INDEX), 2);
    }

    #[tokio::test]
    async fn test_import_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = Arc::new(MemoryStore::new());
        let summary = Importer::new(store).import_file(file.path()).await.unwrap();
        assert_eq!(summary.imported, 2);
    }

    #[tokio::test]
    async fn test_empty_and_malformed_files() {
        let importer = Importer::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            importer.import_json(br#"{"bookmarks": []}"#).await,
            Err(ImportError::Empty)
        ));
        assert!(matches!(
            importer.import_json(b"{not json").await,
            Err(ImportError::Json(_))
        ));
        assert!(matches!(
            importer.import_file("/definitely/not/here.json").await,
            Err(ImportError::Io(_))
        ));
    }
}
