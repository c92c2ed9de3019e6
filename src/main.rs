//! The apocrypha server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use apocrypha::datum::Mapping;
use apocrypha::document::Document;
use apocrypha::error::{ApocryphaError, Result};
use apocrypha::persist::{self, Flusher};
use apocrypha::server;
use apocrypha::store::Store;

/// Apocrypha document store server
#[derive(Parser, Debug)]
#[command(name = "apocrypha")]
#[command(about = "An in-memory, schema-less document store served over TCP")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0", env = "AP_HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 9999, env = "AP_PORT")]
    port: u16,

    /// Full path to the saved database (defaults to ~/.db.json)
    #[arg(long, env = "AP_CNFG")]
    config: Option<PathBuf>,

    /// Seconds between write-behind flushes
    #[arg(long, default_value_t = 1)]
    flush_interval: u64,

    /// Maximum number of cached query results
    #[arg(long, default_value_t = apocrypha::cache::DEFAULT_CAPACITY)]
    cache_size: usize,

    /// Do not persist to disk
    #[arg(long)]
    stateless: bool,
}

fn default_db_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".db.json"),
        None => PathBuf::from(".db.json"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = args.config.clone().unwrap_or_else(default_db_path);
    let root = if args.stateless {
        Mapping::new()
    } else {
        persist::load(&path)?
    };
    let store = Arc::new(Store::new(Document::new(root), args.cache_size));

    let flusher = if args.stateless {
        None
    } else {
        Some(Flusher::spawn(
            Arc::clone(&store),
            path.clone(),
            Duration::from_secs(args.flush_interval),
        ))
    };

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .map_err(|e| ApocryphaError::Config(format!("could not bind {}:{}: {e}", args.host, args.port)))?;
    info!(host = %args.host, port = args.port, db = %path.display(), stateless = args.stateless, "listening");

    tokio::select! {
        served = server::serve(listener, Arc::clone(&store)) => served?,
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    if let Some(flusher) = flusher {
        flusher.stop();
        persist::flush(&store, &path);
    }
    Ok(())
}
