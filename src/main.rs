//! Nomin Node
//!
//! Loads (or deploys) the ledger, then serves the JSON-RPC interface until
//! interrupted.

use clap::Parser;
use nomin_core::node::{Engine, GenesisConfig};
use nomin_core::rpc::{start_rpc_server, RpcState};
use nomin_core::storage::LedgerDb;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nomin-node")]
#[command(about = "Havven / Nomin ledger node")]
struct Cli {
    /// Genesis configuration (TOML); the built-in development deployment if omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database directory
    #[arg(short, long, value_name = "DIR", default_value = "nomin-data")]
    data_dir: PathBuf,

    /// JSON-RPC port
    #[arg(short, long, default_value_t = 8545)]
    rpc_port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let db = LedgerDb::open(&cli.data_dir)?;

    let engine = match db.load_state()? {
        Some(state) => {
            let events = db.load_events()?;
            info!(
                transactions = state.transaction_count,
                events = events.len(),
                "restored ledger from {}",
                cli.data_dir.display()
            );
            Engine::restore(state, events)
        }
        None => {
            let config = match &cli.config {
                Some(path) => GenesisConfig::load(path)?,
                None => GenesisConfig::default(),
            };
            let engine = config.build()?;
            db.commit(engine.state(), engine.events())?;
            info!(owner = %config.owner, "deployed genesis");
            engine
        }
    };

    let state = Arc::new(RpcState::new(engine, Some(db)));

    tokio::select! {
        result = start_rpc_server(state, cli.rpc_port) => {
            if let Err(e) = result {
                error!(error = %e, "RPC server stopped");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}
