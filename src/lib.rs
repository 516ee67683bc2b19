pub mod cli;
pub mod config;
pub mod dead;
pub mod dedup;
pub mod import;
pub mod logging;
pub mod models;
pub mod network;
pub mod prober;
pub mod query;
pub mod reconcile;
pub mod store;

// Re-export main types for library usage
pub use dead::{DeadError, DeadLinks};
pub use dedup::{dedupe, find_duplicates};
pub use import::{ImportError, ImportSummary, Importer};
pub use models::{Bookmark, BookmarkStatus, DuplicateReport};
pub use network::{FetchError, HttpClient};
pub use prober::{BoundedProber, Probe, ProbeSettings};
pub use reconcile::{CheckReport, Partitions, ReconcileError, ReconcileSummary, Reconciler, RewritePhase};
pub use store::{MemoryStore, RecordStore, RedisStore, StoreError};
