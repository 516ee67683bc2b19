//! Logging setup: a stderr layer for the terminal plus an optional rotating JSON file.
//!
//! Standard output is reserved for command results, so the terminal layer
//! writes to stderr alongside the probe progress line.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset. Quiet enough not to fight the progress line.
pub const DEFAULT_FILTER: &str = "warn";

/// Initialize the tracing subscriber.
///
/// Creates up to two outputs:
/// 1. stderr - compact, human-readable
/// 2. `<log_dir>/bm.json.log` - structured JSON, rotated daily (only when `log_dir` is set)
///
/// # Environment Variables
/// * `RUST_LOG` - Controls log level filtering (default: "warn")
///   Examples:
///   - `RUST_LOG=debug` - Show probe decisions per URL
///   - `RUST_LOG=rust_bookmarks=info,reqwest=warn` - Phase summaries only
///
/// The returned guard flushes the file writer on drop; hold it until exit.
pub fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").ok();

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false) // Don't clutter terminal with module paths
        .compact()
        .with_filter(build_filter(rust_log.as_deref())?);

    let (json_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "bm.json.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_current_span(true)
                .with_span_list(true)
                .with_filter(build_filter(rust_log.as_deref())?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()?;

    if let Some(dir) = log_dir {
        tracing::debug!("JSON logs: {}/bm.json.log", dir.display());
    }

    Ok(guard)
}

/// `RUST_LOG` when set and non-empty, otherwise [`DEFAULT_FILTER`].
fn build_filter(spec: Option<&str>) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    match spec.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => EnvFilter::try_new(s),
        None => EnvFilter::try_new(DEFAULT_FILTER),
    }
}
