//! URL-keyed deduplication.
//!
//! Equality is the exact URL string: no case folding, no trailing-slash or
//! query normalization. `https://a.example` and `https://a.example/` are
//! different bookmarks here.

use std::collections::{HashMap, HashSet};

use crate::models::{Bookmark, DuplicateReport};

/// Keep the first record for every URL, preserving input order.
pub fn dedupe(records: &[Bookmark]) -> Vec<Bookmark> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|bm| seen.insert(bm.url.as_str()))
        .cloned()
        .collect()
}

/// Every URL that occurs more than once, ordered by its first occurrence.
pub fn find_duplicates(records: &[Bookmark]) -> Vec<DuplicateReport> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for bm in records {
        let count = counts.entry(bm.url.as_str()).or_insert(0);
        if *count == 0 {
            order.push(bm.url.as_str());
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter_map(|url| {
            let occurrence_count = counts[url];
            (occurrence_count > 1).then(|| DuplicateReport {
                url: url.to_string(),
                occurrence_count,
            })
        })
        .collect()
}
