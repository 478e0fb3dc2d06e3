mod input;
mod snapshot;
mod sync;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use postsync_core::Platform;
use postsync_db::SqliteSnapshotStore;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "postsync")]
#[command(about = "Reconcile scraped social post metrics into tracking sheets")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile a scraper backup into the platform's sheet
    Sync {
        /// Platform to sync (tiktok or facebook)
        #[arg(long)]
        platform: Platform,
        /// Scraper backup (JSON array of posts) or Facebook export (.csv)
        #[arg(long)]
        input: PathBuf,
        /// Plan the run without saving the snapshot or writing the sheet
        #[arg(long)]
        dry_run: bool,
    },
    /// List posts whose likes grew past the threshold since the last snapshot
    Growth {
        #[arg(long)]
        platform: Platform,
        #[arg(long)]
        input: PathBuf,
        /// Growth percentage that triggers a follow-up scrape
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Inspect stored snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Fill in missing titles and descriptions for existing rows
    Recall {
        #[arg(long)]
        platform: Platform,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum SnapshotCommands {
    /// Print the stored snapshot rows
    Show {
        #[arg(long)]
        platform: Platform,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the snapshot database answers
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = postsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("no command given; run `postsync --help` for usage");
        return Ok(());
    };

    let pool_config = postsync_db::PoolConfig::from_app_config(&config);
    let pool = postsync_db::connect_pool(&config.database_url, pool_config).await?;
    let store = SqliteSnapshotStore::init(pool).await?;

    match command {
        Commands::Sync {
            platform,
            input,
            dry_run,
        } => sync::run_sync(&config, &store, platform, &input, dry_run).await,
        Commands::Growth {
            platform,
            input,
            threshold,
        } => sync::run_growth(&config, &store, platform, &input, threshold).await,
        Commands::Snapshot {
            command: SnapshotCommands::Show { platform },
        } => snapshot::run_snapshot_show(&store, platform).await,
        Commands::Recall { platform } => sync::run_recall_command(&config, platform).await,
        Commands::Db {
            command: DbCommands::Ping,
        } => snapshot::run_db_ping(&store).await,
    }
}
