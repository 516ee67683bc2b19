//! Bounded fan-out of health probes over a record set.
//!
//! A counting semaphore caps in-flight probes; every probe reports into a
//! collector and bumps a shared progress counter. Both entry points return
//! only after every probe has finished.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::models::Bookmark;

/// One reachability check. Implementations absorb their own errors: `false` means dead.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str, timeout: Duration) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeSettings {
    pub concurrency: usize,
    pub timeout: Duration,
    pub show_progress: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            concurrency: Config::DEFAULT_CONCURRENCY,
            timeout: Duration::from_secs(Config::DEFAULT_TIMEOUT_SECS),
            show_progress: true,
        }
    }
}

/// Completed-probe counter with a one-line terminal readout.
#[derive(Debug)]
pub struct Progress {
    active_verb: &'static str,
    done_verb: &'static str,
    total: usize,
    completed: AtomicUsize,
    enabled: bool,
}

impl Progress {
    pub fn new(active_verb: &'static str, done_verb: &'static str, total: usize, enabled: bool) -> Self {
        Self {
            active_verb,
            done_verb,
            total,
            completed: AtomicUsize::new(0),
            enabled,
        }
    }

    /// Record one finished probe and return the new count.
    pub fn tick(&self) -> usize {
        let n = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.enabled {
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "\r{} {}/{} ...", self.active_verb, n, self.total);
            let _ = err.flush();
        }
        n
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    fn finish(&self) {
        if self.enabled {
            eprintln!(
                "\r{} {}/{}: done.               ",
                self.done_verb,
                self.completed(),
                self.total
            );
        }
    }
}

/// Runs a [`Probe`] over many records with a concurrency ceiling.
#[derive(Clone)]
pub struct BoundedProber {
    prober: Arc<dyn Probe>,
    settings: ProbeSettings,
}

impl BoundedProber {
    pub fn new(prober: Arc<dyn Probe>, settings: ProbeSettings) -> Self {
        let settings = ProbeSettings {
            concurrency: settings.concurrency.max(1),
            ..settings
        };
        Self { prober, settings }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// URLs of every record whose probe failed. Workers append to a shared locked set.
    #[tracing::instrument(skip_all, fields(records = records.len(), concurrency = self.settings.concurrency))]
    pub async fn find_dead(&self, records: &[Bookmark]) -> HashSet<String> {
        let progress = Arc::new(Progress::new(
            "Checking",
            "Checked",
            records.len(),
            self.settings.show_progress,
        ));
        let dead = Arc::new(Mutex::new(HashSet::new()));
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut tasks = JoinSet::new();

        for record in records {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let prober = Arc::clone(&self.prober);
            let progress = Arc::clone(&progress);
            let dead = Arc::clone(&dead);
            let url = record.url.clone();
            let deadline = self.settings.timeout;

            tasks.spawn(async move {
                let healthy = prober.probe(&url, deadline).await;
                drop(permit);
                if !healthy {
                    dead.lock().insert(url);
                }
                progress.tick();
            });

            while let Some(joined) = tasks.try_join_next() {
                log_join_error(joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            log_join_error(joined);
        }
        progress.finish();

        let dead = std::mem::take(&mut *dead.lock());
        tracing::info!(dead = dead.len(), "dead-link scan finished");
        dead
    }

    /// Keep (`true`) or drop decision for each record, at the record's own position.
    ///
    /// Each probe returns its index and the orchestrating task writes the slot,
    /// so the result array is never shared between workers.
    #[tracing::instrument(skip_all, fields(records = records.len(), concurrency = self.settings.concurrency))]
    pub async fn validate(&self, records: &[Bookmark]) -> Vec<bool> {
        let progress = Arc::new(Progress::new(
            "Validating",
            "Validated",
            records.len(),
            self.settings.show_progress,
        ));
        let mut keep = vec![false; records.len()];
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency));
        let mut tasks = JoinSet::new();

        for (idx, record) in records.iter().enumerate() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let prober = Arc::clone(&self.prober);
            let progress = Arc::clone(&progress);
            let url = record.url.clone();
            let deadline = self.settings.timeout;

            tasks.spawn(async move {
                let healthy = prober.probe(&url, deadline).await;
                drop(permit);
                progress.tick();
                (idx, healthy)
            });

            while let Some(joined) = tasks.try_join_next() {
                record_keep(&mut keep, joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record_keep(&mut keep, joined);
        }
        progress.finish();

        tracing::info!(
            kept = keep.iter().filter(|k| **k).count(),
            "validation finished"
        );
        keep
    }
}

// A panicked probe leaves its slot `false`, same as any other failure.
fn record_keep(keep: &mut [bool], joined: Result<(usize, bool), tokio::task::JoinError>) {
    match joined {
        Ok((idx, healthy)) => keep[idx] = healthy,
        Err(e) => tracing::warn!(error = %e, "probe task failed"),
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::warn!(error = %e, "probe task failed");
    }
}
