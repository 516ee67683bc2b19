use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{RecordStore, StoreError};

/// In-process record store with the same ordering rules as Redis: a sorted
/// index orders by score, then by member bytes, and a member appears once.
///
/// Mutations can be made to fail after a fixed number of successful writes,
/// which is how partial rewrites are exercised in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    writes_left: Mutex<Option<usize>>,
    writes: AtomicUsize,
}

#[derive(Debug, Default)]
struct Inner {
    indices: HashMap<String, Vec<(f64, String)>>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `n` more successful mutations, then fail every later one.
    pub fn fail_writes_after(&self, n: usize) {
        *self.writes_left.lock() = Some(n);
    }

    /// Total successful mutations so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Snapshot of a set's members, sorted.
    pub fn set_members(&self, set: &str) -> Vec<String> {
        self.inner
            .lock()
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn index_len(&self, index: &str) -> usize {
        self.inner.lock().indices.get(index).map_or(0, Vec::len)
    }

    pub fn key_exists(&self, key: &str) -> bool {
        let inner = self.inner.lock();
        inner.indices.contains_key(key) || inner.sets.contains_key(key)
    }

    fn check_write(&self, op: &'static str, key: &str) -> Result<(), StoreError> {
        let mut left = self.writes_left.lock();
        if let Some(n) = left.as_mut() {
            if *n == 0 {
                return Err(StoreError::Injected {
                    op,
                    key: key.to_string(),
                });
            }
            *n -= 1;
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn range_all(&self, index: &str) -> Result<Vec<(f64, String)>, StoreError> {
        Ok(self.inner.lock().indices.get(index).cloned().unwrap_or_default())
    }

    async fn add_to_sorted_index(&self, index: &str, score: f64, member: &str) -> Result<(), StoreError> {
        self.check_write("ZADD", index)?;
        let mut inner = self.inner.lock();
        let entries = inner.indices.entry(index.to_string()).or_default();
        entries.retain(|(_, m)| m != member);
        entries.push((score, member.to_string()));
        entries.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(())
    }

    async fn remove_from_sorted_index(&self, index: &str, member: &str) -> Result<(), StoreError> {
        self.check_write("ZREM", index)?;
        let mut inner = self.inner.lock();
        if let Some(entries) = inner.indices.get_mut(index) {
            entries.retain(|(_, m)| m != member);
            if entries.is_empty() {
                inner.indices.remove(index);
            }
        }
        Ok(())
    }

    async fn add_to_set(&self, set: &str, value: &str) -> Result<bool, StoreError> {
        self.check_write("SADD", set)?;
        Ok(self
            .inner
            .lock()
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(value.to_string()))
    }

    async fn remove_from_set(&self, set: &str, value: &str) -> Result<(), StoreError> {
        self.check_write("SREM", set)?;
        let mut inner = self.inner.lock();
        if let Some(members) = inner.sets.get_mut(set) {
            members.remove(value);
            if members.is_empty() {
                inner.sets.remove(set);
            }
        }
        Ok(())
    }

    async fn delete_index(&self, key: &str) -> Result<(), StoreError> {
        self.check_write("DEL", key)?;
        let mut inner = self.inner.lock();
        inner.indices.remove(key);
        inner.sets.remove(key);
        Ok(())
    }
}
