//! Targeted operations on the dead partition.

use std::sync::Arc;
use thiserror::Error;

use crate::models::{Bookmark, BookmarkStatus};
use crate::store::{
    ACTIVE_INDEX, ACTIVE_URLS, COMBINED_INDEX, COMBINED_URLS, DEAD_INDEX, DEAD_URLS, RecordStore,
    StoreError, load_bookmarks, load_members, write_record,
};

#[derive(Error, Debug)]
pub enum DeadError {
    #[error("url not found in dead list: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct DeadLinks {
    store: Arc<dyn RecordStore>,
}

impl DeadLinks {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Every record in the dead partition, oldest first.
    pub async fn show(&self) -> Result<Vec<Bookmark>, DeadError> {
        Ok(load_bookmarks(&*self.store, DEAD_INDEX).await?)
    }

    /// Drop the dead index and its membership set. Irreversible.
    #[tracing::instrument(skip(self))]
    pub async fn purge(&self) -> Result<(), DeadError> {
        self.store.delete_index(DEAD_INDEX).await?;
        self.store.delete_index(DEAD_URLS).await?;
        tracing::info!("dead partition purged");
        Ok(())
    }

    /// Move the first dead record with exactly this URL back to active.
    ///
    /// The record is added to the active index and set and to the combined
    /// index and set, then its URL leaves the dead set and its row leaves the
    /// dead index. A miss changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn revive(&self, url: &str) -> Result<Bookmark, DeadError> {
        let dead = load_members(&*self.store, DEAD_INDEX).await?;
        let Some((bookmark, member)) = dead.into_iter().find(|(bm, _)| bm.url == url) else {
            return Err(DeadError::NotFound(url.to_string()));
        };

        let revived = bookmark.with_status(BookmarkStatus::Active);
        let revived_member = revived.to_member().map_err(StoreError::from)?;
        write_record(&*self.store, ACTIVE_INDEX, ACTIVE_URLS, &revived).await?;
        self.store
            .add_to_sorted_index(COMBINED_INDEX, revived.score(), &revived_member)
            .await?;
        self.store.add_to_set(COMBINED_URLS, url).await?;
        self.store.remove_from_set(DEAD_URLS, url).await?;
        self.store.remove_from_sorted_index(DEAD_INDEX, &member).await?;

        tracing::info!(url, "revived");
        Ok(revived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::Importer;
    use crate::store::MemoryStore;

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (url, ts) in [("https://gone.example", 1), ("https://also-gone.example", 2)] {
            let bm = Bookmark::new(url, "gone", ts).with_status(BookmarkStatus::Dead);
            write_record(&*store, DEAD_INDEX, DEAD_URLS, &bm).await.unwrap();
        }
        let live = Bookmark::new("https://live.example", "live", 3).with_status(BookmarkStatus::Active);
        write_record(&*store, ACTIVE_INDEX, ACTIVE_URLS, &live).await.unwrap();
        write_record(&*store, COMBINED_INDEX, COMBINED_URLS, &live).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_revive_moves_exactly_one_record() {
        let store = seeded().await;
        let dead = DeadLinks::new(store.clone());

        let revived = dead.revive("https://gone.example").await.unwrap();
        assert_eq!(revived.status, BookmarkStatus::Active);
        assert_eq!(revived.created_at, 1);

        assert_eq!(
            store.set_members(ACTIVE_URLS),
            vec!["https://gone.example", "https://live.example"]
        );
        assert_eq!(store.set_members(DEAD_URLS), vec!["https://also-gone.example"]);
        assert_eq!(store.index_len(COMBINED_INDEX), 2);
        assert_eq!(
            store.set_members(COMBINED_URLS),
            vec!["https://gone.example", "https://live.example"]
        );

        let remaining = dead.show().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].url, "https://also-gone.example");
    }

    #[tokio::test]
    async fn test_revive_miss_changes_nothing() {
        let store = seeded().await;
        let before = store.write_count();
        let dead = DeadLinks::new(store.clone());

        let err = dead.revive("https://live.example").await.unwrap_err();
        assert!(matches!(err, DeadError::NotFound(ref u) if u == "https://live.example"));
        assert_eq!(store.write_count(), before);
        assert_eq!(dead.show().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_import_after_revive_skips_the_url() {
        let store = seeded().await;
        DeadLinks::new(store.clone())
            .revive("https://gone.example")
            .await
            .unwrap();

        let export = br#"{"bookmarks": [{"url": "https://gone.example", "title": "again"}]}"#;
        let summary = Importer::new(store.clone()).import_json(export).await.unwrap();
        assert_eq!(summary.imported, 0);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(store.index_len(COMBINED_INDEX), 2);
    }

    #[tokio::test]
    async fn test_revive_requires_exact_url() {
        let store = seeded().await;
        let dead = DeadLinks::new(store);
        assert!(matches!(
            dead.revive("https://gone.example/").await,
            Err(DeadError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_removes_dead_partition_only() {
        let store = seeded().await;
        let dead = DeadLinks::new(store.clone());

        dead.purge().await.unwrap();

        assert!(dead.show().await.unwrap().is_empty());
        assert!(!store.key_exists(DEAD_INDEX));
        assert!(!store.key_exists(DEAD_URLS));
        assert_eq!(store.set_members(ACTIVE_URLS), vec!["https://live.example"]);
    }
}
