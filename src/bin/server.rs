//! # Ingestion Service Entry Point
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin server -- --config config/server.toml
//! cargo run --bin server -- --address 127.0.0.1:8080 --data-root ./samples
//! ```
//!
//! The server will:
//! 1. Load configuration (file optional, flags override it)
//! 2. Create the run directory `<root>/YYYY-MM-DD_HH-MM-SS`
//! 3. Accept `POST /` submissions until Ctrl-C

use anyhow::Context;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

use goat_ingest::common::config::{load_config, ServiceConfig};
use goat_ingest::common::logging::init_logger;
use goat_ingest::common::store::ArtifactStore;
use goat_ingest::server::{build_router, SampleIngestor, SequenceAllocator};

/// Command-line arguments for the server binary
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the service configuration file (TOML format)
    ///
    /// Example: config/server.toml
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overrides `server.address`
    #[arg(long)]
    address: Option<String>,

    /// Parent directory of run directories, overrides `storage.root`
    #[arg(long)]
    data_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();

    let mut config: ServiceConfig = match &args.config {
        Some(path) => load_config(path).with_context(|| format!("loading {}", path))?,
        None => ServiceConfig::default(),
    };
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(root) = args.data_root {
        config.storage.root = root;
    }

    let store = ArtifactStore::create_run_dir(&config.storage.root, chrono::Local::now()).await?;
    info!("📁 Storing samples in {}", store.dir().display());
    info!(
        "📦 Uploads buffered in memory up to {} bytes, capped at {} bytes",
        config.upload.memory_limit_bytes, config.upload.max_body_bytes
    );

    let ingestor = SampleIngestor::new(Arc::new(SequenceAllocator::new()), store);
    let app = build_router(ingestor, &config.upload);

    let listener = tokio::net::TcpListener::bind(&config.server.address)
        .await
        .with_context(|| format!("binding {}", config.server.address))?;
    info!("🌐 Ingestion service listening on http://{}", config.server.address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("🛑 Ctrl-C received, shutting down");
    }
}
