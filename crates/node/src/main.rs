//! Checkpoint Node
//!
//! Main entry point for the root chain checkpoint node.
//! Initializes state from genesis, replays blocks of checkpoint messages and
//! answers queries against the committed state. State is persisted to disk and
//! survives restarts.

use anyhow::Result;
use checkpoint_store::{ChainMetadata, MemoryStore, PersistentStore, StorePersistence};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod genesis;
mod replay;

use config::NodeConfig;
use genesis::Genesis;
use replay::Replayer;

/// Root chain checkpoint node
#[derive(Parser, Debug)]
#[command(name = "checkpointd")]
#[command(about = "Checkpoint state machine for root chain anchoring", long_about = None)]
struct Args {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Data directory for persistent state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write genesis state into a fresh data directory
    Init {
        /// Genesis JSON file
        #[arg(long)]
        genesis: PathBuf,
    },
    /// Apply a JSON-lines block file on top of the persisted state
    Replay {
        /// Blocks file, one {height, time, txs} object per line
        #[arg(long)]
        blocks: PathBuf,

        /// Save state every N blocks (0 = only at the end)
        #[arg(long)]
        save_interval: Option<u64>,
    },
    /// Run a checkpoint query against the persisted state
    Query {
        /// Query path, e.g. ack-count or checkpoint-list
        path: String,

        /// JSON params
        #[arg(long)]
        data: Option<String>,
    },
}

fn resolve_config(args: &Args) -> Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => NodeConfig::load(path)?,
        None => NodeConfig::default(),
    };

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone();
    }
    if let Command::Replay {
        save_interval: Some(interval),
        ..
    } = &args.command
    {
        config.save_interval = *interval;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    // Initialize logging, stdout is reserved for query output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match args.command {
        Command::Init { genesis } => run_init(&config, &genesis),
        Command::Replay { blocks, .. } => run_replay(&config, &blocks).await,
        Command::Query { path, data } => run_query(&config, &path, data.as_deref()),
    }
}

/// Open the data directory and load the keeper saved there
fn load_state(config: &NodeConfig) -> Result<(PersistentStore, MemoryStore, ChainMetadata)> {
    let disk = PersistentStore::open(&config.data_dir)?;
    let metadata = disk.load_metadata()?.ok_or_else(|| {
        anyhow::anyhow!(
            "no state found in {:?}, run `checkpointd init` first",
            config.data_dir
        )
    })?;

    let mut store = MemoryStore::default();
    let loaded = store.load_from_disk(&disk)?;
    tracing::info!(
        "Loaded state at height {}: {} checkpoints, ack count {}",
        metadata.height,
        loaded,
        metadata.ack_count
    );

    Ok((disk, store, metadata))
}

fn run_init(config: &NodeConfig, genesis_path: &Path) -> Result<()> {
    tracing::info!("Initializing checkpoint node");
    tracing::info!("  Genesis: {:?}", genesis_path);
    tracing::info!("  Data directory: {:?}", config.data_dir);

    std::fs::create_dir_all(&config.data_dir)?;
    let disk = PersistentStore::open(&config.data_dir)?;
    if disk.load_metadata()?.is_some() {
        anyhow::bail!("data directory {:?} is already initialized", config.data_dir);
    }

    let store = Genesis::load(genesis_path)?.into_store()?;
    store.save_to_disk(
        &disk,
        &ChainMetadata {
            saved_at: chrono::Utc::now().timestamp(),
            ..Default::default()
        },
    )?;

    tracing::info!("Genesis state written");
    Ok(())
}

async fn run_replay(config: &NodeConfig, blocks_path: &Path) -> Result<()> {
    tracing::info!("Starting checkpoint replay");
    tracing::info!("  Blocks: {:?}", blocks_path);
    tracing::info!("  Data directory: {:?}", config.data_dir);
    tracing::info!("  Save interval: {} blocks", config.save_interval);

    let (disk, store, metadata) = load_state(config)?;
    let blocks = replay::read_blocks(blocks_path)?;
    let mut replayer = Replayer::new(store, &metadata);

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal = shutdown.clone();
    let signal_handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.store(true, Ordering::SeqCst);
        }
    });

    let mut applied = 0usize;
    let mut rejected = 0usize;
    for block in &blocks {
        if shutdown.load(Ordering::SeqCst) {
            tracing::info!("Shutting down...");
            break;
        }
        if block.height <= replayer.height() {
            tracing::debug!(height = block.height, "Skipping already applied block");
            continue;
        }

        let outcome = replayer.apply_block(block)?;
        applied += outcome.applied;
        rejected += outcome.rejected;

        // Periodic save to disk
        if config.save_interval > 0 && block.height % config.save_interval == 0 {
            if let Err(e) = replayer.save(&disk) {
                tracing::error!("Failed to save state: {}", e);
            } else {
                tracing::info!("Saved state at height {}", block.height);
            }
        }

        tokio::task::yield_now().await;
    }

    tracing::info!("Saving final state at height {}...", replayer.height());
    let saved = replayer.save(&disk)?;
    tracing::info!(
        "Replay finished at height {}: {} txs applied, {} rejected, {} checkpoints saved",
        replayer.height(),
        applied,
        rejected,
        saved
    );

    signal_handle.abort();
    Ok(())
}

fn run_query(config: &NodeConfig, path: &str, data: Option<&str>) -> Result<()> {
    let (_disk, store, _metadata) = load_state(config)?;
    let data = data.unwrap_or_default().as_bytes();

    let result = checkpoint::query(&store, &store, path, data)
        .map_err(|e| anyhow::anyhow!("query {} failed ({}): {}", path, e.code(), e))?;
    println!("{}", String::from_utf8_lossy(&result));

    Ok(())
}
