use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Config, parse_duration};
use crate::query::parse_date;

/// Bookmark manager: import, list and search bookmarks, find duplicates and dead links.
/// Exit codes: 0=success, 1=runtime error (store unreachable, url not found), 2=invalid arguments
#[derive(Parser, Debug)]
#[command(name = "bm")]
#[command(about = "Bookmark manager - check duplicates and dead links")]
#[command(version)]
pub struct Cli {
    /// Redis connection URL; falls back to REDIS_URL, then REDIS_ADDR/REDIS_DB/REDIS_PASSWORD
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    /// Also write JSON logs (rotated daily) into this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command that probes links.
#[derive(Args, Debug, Clone, Copy)]
pub struct ProbeArgs {
    #[arg(
        long,
        default_value_t = Config::DEFAULT_CONCURRENCY,
        help = "Parallel URL checks"
    )]
    pub concurrency: usize,

    #[arg(
        long,
        default_value = "8s",
        value_parser = parse_duration,
        help = "HTTP timeout per request (e.g. 8s, 500ms, 1m)"
    )]
    pub timeout: Duration,

    #[arg(long, help = "Do not print the live progress line")]
    pub no_progress: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import bookmarks from a JSON file; URLs already stored are skipped.
    Import {
        #[arg(help = "Path to a JSON file with a top-level \"bookmarks\" array")]
        file: PathBuf,
    },

    /// Report duplicates and dead links without changing anything.
    Check {
        #[command(flatten)]
        probe: ProbeArgs,
    },

    /// Remove duplicates and rebuild the active/dead partitions.
    Clean {
        #[command(flatten)]
        probe: ProbeArgs,
    },

    /// List bookmarks (active by default).
    List {
        #[arg(long, default_value_t = Config::DEFAULT_LIST_LIMIT, help = "Max items (0 = no limit)")]
        limit: usize,

        #[arg(long = "tag", help = "Filter by tag (repeatable)")]
        tags: Vec<String>,

        #[arg(long, help = "Include dead bookmarks")]
        include_dead: bool,
    },

    /// Search title, description and URL.
    Search {
        #[arg(long = "q", help = "Query string")]
        query: Option<String>,

        #[arg(long = "tag", help = "Filter by tag (repeatable)")]
        tags: Vec<String>,

        #[arg(long, value_parser = parse_date, help = "Created on or after (YYYY-MM-DD)")]
        from: Option<chrono::NaiveDate>,

        #[arg(long, value_parser = parse_date, help = "Created on or before (YYYY-MM-DD)")]
        to: Option<chrono::NaiveDate>,

        #[arg(long, default_value_t = Config::DEFAULT_LIST_LIMIT, help = "Max items (0 = no limit)")]
        limit: usize,

        #[arg(long, help = "Include dead bookmarks")]
        include_dead: bool,
    },

    /// Manage dead links.
    Dead {
        #[command(subcommand)]
        action: DeadCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeadCommand {
    /// List dead bookmarks.
    Show,
    /// Delete the dead bookmarks index.
    Purge,
    /// Move a URL from dead back to active.
    Revive {
        #[arg(help = "Exact URL as stored")]
        url: String,
    },
}

impl Cli {
    /// Parse CLI arguments so the rest of the program can rely on structured options.
    /// On error, clap prints help and exits with code 2 (usage error).
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
