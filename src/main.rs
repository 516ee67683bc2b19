use rust_bookmarks::cli::{Cli, Commands, DeadCommand, ProbeArgs};
use rust_bookmarks::config::{Config, StoreConfig};
use rust_bookmarks::query::{self, SearchFilter, format_bookmarks};
use rust_bookmarks::{
    BoundedProber, DeadError, DeadLinks, HttpClient, ImportError, Importer, ProbeSettings,
    ReconcileError, Reconciler, RecordStore, RedisStore, StoreError,
};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MainError {
    #[error("Failed to connect to Redis: {0}")]
    Connect(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Dead(#[from] DeadError),

    #[error(transparent)]
    Import(#[from] ImportError),
}

fn build_prober(args: ProbeArgs) -> BoundedProber {
    let http = Arc::new(HttpClient::new(Config::USER_AGENT.to_string()));
    BoundedProber::new(
        http,
        ProbeSettings {
            concurrency: args.concurrency,
            timeout: args.timeout,
            show_progress: !args.no_progress,
        },
    )
}

async fn run_check_command(store: Arc<dyn RecordStore>, args: ProbeArgs) -> Result<(), MainError> {
    println!("Checking bookmarks for duplicates and dead links...");

    let reconciler = Reconciler::new(store, build_prober(args));
    let records = reconciler.load_input().await?;
    if records.is_empty() {
        println!("No bookmarks found");
        return Ok(());
    }
    println!("Found {} bookmarks\n", records.len());

    let report = reconciler.check(&records).await;

    if report.duplicates.is_empty() {
        println!("No duplicates found");
    } else {
        println!("Found {} duplicate URLs:", report.duplicates.len());
        for dup in &report.duplicates {
            println!("  - {} ({} occurrences)", dup.url, dup.occurrence_count);
        }
        println!();
    }

    if report.dead.is_empty() {
        println!("All links are active");
    } else {
        println!("Found {} dead links:", report.dead.len());
        for bm in &report.dead {
            println!("  - {} ({})", bm.title, bm.url);
        }
        println!();
    }

    println!(
        "Summary: {} total, {} duplicates, {} dead links",
        report.total,
        report.duplicates.len(),
        report.dead.len()
    );
    Ok(())
}

async fn run_clean_command(store: Arc<dyn RecordStore>, args: ProbeArgs) -> Result<(), MainError> {
    println!("Cleaning bookmarks...");

    let reconciler = Reconciler::new(store, build_prober(args));
    let records = reconciler.load_input().await?;
    if records.is_empty() {
        println!("No bookmarks to clean");
        return Ok(());
    }

    let summary = reconciler.reconcile(&records).await?;
    println!("Removed {} duplicate bookmarks", summary.duplicates_removed);
    println!("Moved {} dead bookmarks to the dead list", summary.dead_count);
    println!(
        "Cleanup complete: {} active, {} dead",
        summary.active_count, summary.dead_count
    );
    Ok(())
}

async fn run_dead_command(store: Arc<dyn RecordStore>, action: DeadCommand) -> Result<(), MainError> {
    let dead = DeadLinks::new(store);
    match action {
        DeadCommand::Show => {
            print!("{}", format_bookmarks(&dead.show().await?));
        }
        DeadCommand::Purge => {
            dead.purge().await?;
            println!("Deleted dead bookmarks index");
        }
        DeadCommand::Revive { url } => {
            let revived = dead.revive(&url).await?;
            println!("Revived: {}", revived.url);
        }
    }
    Ok(())
}

async fn run(cli: Cli, store: Arc<dyn RecordStore>) -> Result<(), MainError> {
    match cli.command {
        Commands::Import { file } => {
            println!("Importing bookmarks from {}...", file.display());
            let summary = Importer::new(store).import_file(&file).await?;
            println!(
                "Import complete: {} imported, {} skipped ({} duplicates, {} invalid)",
                summary.imported,
                summary.duplicates + summary.invalid,
                summary.duplicates,
                summary.invalid
            );
        }
        Commands::Check { probe } => run_check_command(store, probe).await?,
        Commands::Clean { probe } => run_clean_command(store, probe).await?,
        Commands::List {
            limit,
            tags,
            include_dead,
        } => {
            let filter = SearchFilter {
                tags,
                limit: Some(limit),
                ..Default::default()
            };
            let items = query::search(&*store, &filter, include_dead).await?;
            print!("{}", format_bookmarks(&items));
        }
        Commands::Search {
            query: q,
            tags,
            from,
            to,
            limit,
            include_dead,
        } => {
            let filter = SearchFilter {
                query: q,
                tags,
                from,
                to,
                limit: Some(limit),
            };
            let items = query::search(&*store, &filter, include_dead).await?;
            print!("{}", format_bookmarks(&items));
        }
        Commands::Dead { action } => run_dead_command(store, action).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let _log_guard = match rust_bookmarks::logging::init_logging(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    let store_config = StoreConfig::resolve(cli.redis_url.clone());
    let store = match RedisStore::open(&store_config.redis_url).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{}", MainError::Connect(e));
            return ExitCode::FAILURE;
        }
    };

    let result = run(cli, Arc::new(store.clone())).await;
    store.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
