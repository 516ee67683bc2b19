//! Record store adapter: the few key-value primitives the engine needs.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Bookmark;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Combined index mirroring the active partition.
pub const COMBINED_INDEX: &str = "bookmarks:index";
pub const COMBINED_URLS: &str = "bookmarks:urls";
pub const ACTIVE_INDEX: &str = "bookmarks:active";
pub const ACTIVE_URLS: &str = "bookmarks:urls:active";
pub const DEAD_INDEX: &str = "bookmarks:dead";
pub const DEAD_URLS: &str = "bookmarks:urls:dead";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Injected store fault on {op} {key}")]
    Injected { op: &'static str, key: String },
}

/// Sorted-index and set primitives over the backing store.
///
/// Sorted indices are ordered by score (creation time) and hold serialized
/// [`Bookmark`] members. Sets hold bare URLs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Full scan of a sorted index as `(score, member)` pairs, ascending by score.
    async fn range_all(&self, index: &str) -> Result<Vec<(f64, String)>, StoreError>;

    async fn add_to_sorted_index(&self, index: &str, score: f64, member: &str) -> Result<(), StoreError>;

    async fn remove_from_sorted_index(&self, index: &str, member: &str) -> Result<(), StoreError>;

    /// Returns `true` when the value was not already a member.
    async fn add_to_set(&self, set: &str, value: &str) -> Result<bool, StoreError>;

    async fn remove_from_set(&self, set: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key entirely. Works for both sorted indices and sets.
    async fn delete_index(&self, key: &str) -> Result<(), StoreError>;
}

/// Decode every member of `index`, dropping ones that fail to parse.
pub async fn load_bookmarks(store: &dyn RecordStore, index: &str) -> Result<Vec<Bookmark>, StoreError> {
    Ok(load_members(store, index)
        .await?
        .into_iter()
        .map(|(bookmark, _)| bookmark)
        .collect())
}

/// Like [`load_bookmarks`] but keeps the raw member next to each record, for exact removal.
pub async fn load_members(
    store: &dyn RecordStore,
    index: &str,
) -> Result<Vec<(Bookmark, String)>, StoreError> {
    let entries = store.range_all(index).await?;
    let mut out = Vec::with_capacity(entries.len());
    for (_, member) in entries {
        match Bookmark::from_member(&member) {
            Ok(bookmark) => out.push((bookmark, member)),
            Err(e) => {
                tracing::trace!(index, error = %e, "skipping malformed member");
            }
        }
    }
    Ok(out)
}

/// Write one record into a sorted index and its companion URL set.
pub async fn write_record(
    store: &dyn RecordStore,
    index: &str,
    urls: &str,
    bookmark: &Bookmark,
) -> Result<(), StoreError> {
    let member = bookmark.to_member()?;
    store.add_to_sorted_index(index, bookmark.score(), &member).await?;
    store.add_to_set(urls, &bookmark.url).await?;
    Ok(())
}
