//! Read-side listing and filtering over the partitions.

use chrono::{NaiveDate, NaiveTime};

use crate::models::Bookmark;
use crate::store::{ACTIVE_INDEX, DEAD_INDEX, RecordStore, StoreError, load_bookmarks};

/// Filters shared by `list` and `search`. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub query: Option<String>,
    pub tags: Vec<String>,
    /// Inclusive, UTC.
    pub from: Option<NaiveDate>,
    /// Inclusive through the end of the day, UTC.
    pub to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl SearchFilter {
    pub fn matches(&self, bm: &Bookmark) -> bool {
        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            let hit = bm.title.to_lowercase().contains(&q)
                || bm.description.to_lowercase().contains(&q)
                || bm.url.to_lowercase().contains(&q);
            if !hit {
                return false;
            }
        }

        if !self.tags.iter().all(|t| bm.has_tag(t)) {
            return false;
        }

        if let Some(from) = self.from {
            let start = from.and_time(NaiveTime::MIN).and_utc().timestamp();
            if bm.created_at < start {
                return false;
            }
        }
        if let Some(to) = self.to {
            let end = to
                .succ_opt()
                .map(|next| next.and_time(NaiveTime::MIN).and_utc().timestamp())
                .unwrap_or(i64::MAX);
            if bm.created_at >= end {
                return false;
            }
        }

        true
    }

    pub fn apply(&self, items: Vec<Bookmark>) -> Vec<Bookmark> {
        let matched = items.into_iter().filter(|bm| self.matches(bm));
        match self.limit.filter(|l| *l > 0) {
            Some(limit) => matched.take(limit).collect(),
            None => matched.collect(),
        }
    }
}

/// Parse a `YYYY-MM-DD` date for the `--from`/`--to` flags.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}' (expected YYYY-MM-DD): {}", raw, e))
}

/// Active partition, then dead when asked for.
pub async fn load_pool(store: &dyn RecordStore, include_dead: bool) -> Result<Vec<Bookmark>, StoreError> {
    let mut pool = load_bookmarks(store, ACTIVE_INDEX).await?;
    if include_dead {
        pool.extend(load_bookmarks(store, DEAD_INDEX).await?);
    }
    Ok(pool)
}

pub async fn search(
    store: &dyn RecordStore,
    filter: &SearchFilter,
    include_dead: bool,
) -> Result<Vec<Bookmark>, StoreError> {
    Ok(filter.apply(load_pool(store, include_dead).await?))
}

/// Render records the way every listing command prints them.
pub fn format_bookmarks(items: &[Bookmark]) -> String {
    if items.is_empty() {
        return "No bookmarks found\n".to_string();
    }

    let mut out = format!("{} bookmarks:\n\n", items.len());
    for (i, bm) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, bm.title));
        out.push_str(&format!("   {}\n", bm.url));
        if !bm.description.is_empty() {
            out.push_str(&format!("   {}\n", bm.description));
        }
        if !bm.tags.is_empty() {
            out.push_str(&format!("   Tags: {}\n", bm.tags.join(", ")));
        }
        out.push('\n');
    }
    out
}
