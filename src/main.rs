use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use player_sync::config::AppConfig;
use player_sync::jobs::LeaderboardJob;
use player_sync::models::{PlayerId, Region};
use player_sync::remote::{FileTokenStore, StatsClient, TokenManager};
use player_sync::storage::{JsonlStore, StorageConfig};
use player_sync::sync::{PlayerQuery, PlayerSync, ResolveOptions, ResolveOutcome};

#[derive(Parser)]
#[command(name = "player-sync")]
#[command(about = "Player identity and stats sync against a remote ranked stats service")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a player by username or id and refresh their stats
    Resolve {
        /// Username, or a 24 hex digit player id
        input: String,

        /// Return the cached record without contacting the remote service
        #[arg(long)]
        cached: bool,

        /// Region to probe instead of the full probe order
        #[arg(long)]
        region: Option<Region>,

        /// Print the resolved profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the leaderboard table and sync every listed player
    Leaderboard,

    /// Create a ghost record for a username whose id is not known yet
    SeedGhost { username: String },

    /// Delete every rating row of a player
    PurgeRatings { id: String },

    /// Delete name history rows of a player at the given timestamps
    DeleteNameHistory {
        id: String,

        /// RFC 3339 timestamps of the rows to delete
        #[arg(required = true)]
        changed_at: Vec<DateTime<Utc>>,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

async fn build_sync(config: &AppConfig) -> Result<PlayerSync> {
    let store = JsonlStore::open(StorageConfig::new(config.data_dir.clone()))
        .context("Failed to open record store")?;

    let token_store = Arc::new(FileTokenStore::new(config.remote.token_file.clone()));
    let tokens = Arc::new(
        TokenManager::load(token_store)
            .await
            .context("Failed to load tokens")?,
    );
    let client = StatsClient::new(&config.remote, tokens).context("Failed to build client")?;

    Ok(PlayerSync::new(Arc::new(client), Arc::new(store)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting player-sync v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;
    let sync = build_sync(&config).await?;

    match cli.command {
        Commands::Resolve {
            input,
            cached,
            region,
            json,
        } => {
            let query = PlayerQuery::parse(&input);
            let options = ResolveOptions {
                trust_cache: cached,
                region_hint: region,
            };

            match sync.resolve(&query, options).await? {
                ResolveOutcome::Resolved {
                    profile,
                    disposition,
                } => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&profile)?);
                    } else {
                        let player = &profile.player;
                        println!("\n=== {} ({:?}) ===", player.username, disposition);
                        println!("Identity:         {}", player.identity);
                        println!("Region:           {}", player.region);
                        if let Some(latest) = profile.latest_rating() {
                            println!("Rating:           {} (#{})", latest.rating, latest.rank);
                        }
                        println!("Rating history:   {}", profile.ratings.len());
                        println!("Character rows:   {}", profile.character_ratings.len());
                    }
                }
                ResolveOutcome::NotFound => {
                    println!("No player found for {}", query);
                }
                ResolveOutcome::TransientUpstream(reason) => {
                    bail!("Remote service unavailable: {}", reason);
                }
                ResolveOutcome::DataCorruption(report) => {
                    bail!(
                        "Player id mismatch for '{}': cached {}, remote {}. Notify an administrator.",
                        report.username,
                        report.cached_id,
                        report.remote_id
                    );
                }
            }
        }

        Commands::Leaderboard => {
            let job = LeaderboardJob::new(Arc::new(sync), config.jobs.clone());
            let report = job.run().await?;

            println!("\n=== Leaderboard Results ===");
            println!("Processed:        {}", report.processed);
            println!("Created:          {}", report.created);
            println!("Updated:          {}", report.updated);
            println!("Unchanged:        {}", report.skipped);
            println!("Failed:           {}", report.failed);
            println!("Duration:         {:?}", report.duration);
            if !report.errors.is_empty() {
                println!("\nErrors:");
                for err in &report.errors {
                    println!("  - {}", err);
                }
            }
        }

        Commands::SeedGhost { username } => {
            let ghost = sync.seed_ghost(&username).await?;
            println!("Seeded ghost {}", ghost.identity);
        }

        Commands::PurgeRatings { id } => {
            let removed = sync.purge_ratings(&PlayerId::from(id.as_str())).await?;
            println!("Removed {} rating rows for {}", removed, id);
        }

        Commands::DeleteNameHistory { id, changed_at } => {
            let removed = sync
                .delete_name_history(&PlayerId::from(id.as_str()), &changed_at)
                .await?;
            println!("Removed {} name history rows for {}", removed, id);
        }
    }

    Ok(())
}
