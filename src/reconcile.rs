//! Dedup + probe + partition + rewrite.
//!
//! The rewrite is several independent store operations with no transaction
//! around them. Each index gets its new rows before its stale rows are removed,
//! and `clean` reads every index back, so a failure part-way never leaves a
//! record outside all of them. The error names the phase that failed; running
//! `clean` again converges.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::dedup::{dedupe, find_duplicates};
use crate::models::{Bookmark, BookmarkStatus, DuplicateReport};
use crate::prober::BoundedProber;
use crate::store::{
    ACTIVE_INDEX, ACTIVE_URLS, COMBINED_INDEX, COMBINED_URLS, DEAD_INDEX, DEAD_URLS, RecordStore,
    StoreError, load_members,
};

/// Which part of the rewrite was running when the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewritePhase {
    Active,
    Dead,
    Combined,
}

impl fmt::Display for RewritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RewritePhase::Active => f.write_str("active partition"),
            RewritePhase::Dead => f.write_str("dead partition"),
            RewritePhase::Combined => f.write_str("combined index"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to load bookmarks: {0}")]
    Load(#[source] StoreError),

    #[error(
        "Rewrite of the {phase} failed, the store now holds a partial rewrite (re-run `clean` to converge): {source}"
    )]
    PartialRewrite {
        phase: RewritePhase,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileSummary {
    pub input_count: usize,
    pub duplicates_removed: usize,
    pub active_count: usize,
    pub dead_count: usize,
}

/// Disjoint split of a deduplicated record set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partitions {
    pub active: Vec<Bookmark>,
    pub dead: Vec<Bookmark>,
}

/// Result of a read-only health check.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub total: usize,
    pub duplicates: Vec<DuplicateReport>,
    /// Dead records in input order. A duplicated dead URL appears once per occurrence.
    pub dead: Vec<Bookmark>,
}

/// Split `records` by the keep decision at the same position.
///
/// Every record whose URL did not make it into the active side is dead, so a
/// URL never lands in both partitions even if the input repeats it.
pub fn partition(records: &[Bookmark], keep: &[bool]) -> Partitions {
    let active: Vec<Bookmark> = records
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(bm, _)| bm.clone().with_status(BookmarkStatus::Active))
        .collect();

    let active_urls: HashSet<&str> = active.iter().map(|bm| bm.url.as_str()).collect();
    let mut dead_urls: HashSet<&str> = HashSet::new();
    let dead = records
        .iter()
        .filter(|bm| !active_urls.contains(bm.url.as_str()) && dead_urls.insert(bm.url.as_str()))
        .map(|bm| bm.clone().with_status(BookmarkStatus::Dead))
        .collect();

    Partitions { active, dead }
}

/// Owns the store handle and the bounded prober for a reconciliation run.
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    prober: BoundedProber,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, prober: BoundedProber) -> Self {
        Self { store, prober }
    }

    /// Active partition, combined index, then dead partition.
    ///
    /// Earlier dead records are probed again, and whatever an interrupted
    /// rewrite left behind in any index is picked up. A row that is
    /// byte-identical to one already read is a mirror (combined copies active)
    /// and is taken once.
    pub async fn load_input(&self) -> Result<Vec<Bookmark>, ReconcileError> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for index in [ACTIVE_INDEX, COMBINED_INDEX, DEAD_INDEX] {
            let members = load_members(&*self.store, index)
                .await
                .map_err(ReconcileError::Load)?;
            for (bookmark, member) in members {
                if seen.insert(member) {
                    records.push(bookmark);
                }
            }
        }
        Ok(records)
    }

    /// Report duplicates and dead links without touching the store.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub async fn check(&self, records: &[Bookmark]) -> CheckReport {
        let duplicates = find_duplicates(records);
        let dead_urls = self.prober.find_dead(records).await;
        let dead = records
            .iter()
            .filter(|bm| dead_urls.contains(&bm.url))
            .cloned()
            .collect();

        CheckReport {
            total: records.len(),
            duplicates,
            dead,
        }
    }

    /// Deduplicate, probe, and replace both partitions and the combined index.
    #[tracing::instrument(skip_all, fields(records = records.len()))]
    pub async fn reconcile(&self, records: &[Bookmark]) -> Result<ReconcileSummary, ReconcileError> {
        let unique = dedupe(records);
        tracing::info!(
            input = records.len(),
            unique = unique.len(),
            "deduplicated input"
        );

        let keep = self.prober.validate(&unique).await;
        let partitions = partition(&unique, &keep);

        self.rewrite(&partitions).await?;

        let summary = ReconcileSummary {
            input_count: records.len(),
            duplicates_removed: records.len() - unique.len(),
            active_count: partitions.active.len(),
            dead_count: partitions.dead.len(),
        };
        tracing::info!(?summary, "reconciliation complete");
        Ok(summary)
    }

    /// Load the current collection and reconcile it. An empty collection is left alone.
    pub async fn clean(&self) -> Result<ReconcileSummary, ReconcileError> {
        let records = self.load_input().await?;
        if records.is_empty() {
            return Ok(ReconcileSummary::default());
        }
        self.reconcile(&records).await
    }

    async fn rewrite(&self, partitions: &Partitions) -> Result<(), ReconcileError> {
        self.replace(RewritePhase::Active, ACTIVE_INDEX, ACTIVE_URLS, &partitions.active)
            .await?;
        self.replace(RewritePhase::Dead, DEAD_INDEX, DEAD_URLS, &partitions.dead)
            .await?;
        self.replace(
            RewritePhase::Combined,
            COMBINED_INDEX,
            COMBINED_URLS,
            &partitions.active,
        )
        .await?;
        Ok(())
    }

    async fn replace(
        &self,
        phase: RewritePhase,
        index: &str,
        urls: &str,
        records: &[Bookmark],
    ) -> Result<(), ReconcileError> {
        let fail = |source: StoreError| ReconcileError::PartialRewrite { phase, source };

        let mut wanted = HashSet::with_capacity(records.len());
        for bookmark in records {
            let member = bookmark
                .to_member()
                .map_err(|e| fail(StoreError::from(e)))?;
            self.store
                .add_to_sorted_index(index, bookmark.score(), &member)
                .await
                .map_err(fail)?;
            wanted.insert(member);
        }

        // Stale rows only go once every new row is in place.
        let existing = self.store.range_all(index).await.map_err(fail)?;
        let mut pruned = 0usize;
        for (_, member) in existing.iter().filter(|(_, m)| !wanted.contains(m)) {
            self.store
                .remove_from_sorted_index(index, member)
                .await
                .map_err(fail)?;
            pruned += 1;
        }

        // Sets hold bare URLs, rebuildable from the indices.
        self.store.delete_index(urls).await.map_err(fail)?;
        for bookmark in records {
            self.store
                .add_to_set(urls, &bookmark.url)
                .await
                .map_err(fail)?;
        }
        tracing::debug!(%phase, count = records.len(), pruned, "partition rewritten");
        Ok(())
    }
}
