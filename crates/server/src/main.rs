use anyhow::Context;
use clap::Parser;
use engine::{Engine, MemoryEngine, RocksEngine};
use server::{spawn_ttl_sweeper, Config, Server};
use std::path::PathBuf;
use std::sync::Arc;
use store::Store;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "redrange-server", about = "Redis-compatible server over ordered KV engines")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long)]
    addr: Option<String>,

    /// Override the engine backend (memory | rocksdb)
    #[arg(long)]
    engine: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(addr) = args.addr {
        config.server.listen_addr = addr;
    }
    if let Some(engine) = args.engine {
        config.storage.engine = engine;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone())),
        )
        .init();

    let engine: Arc<dyn Engine> = match config.storage.engine.as_str() {
        "memory" => Arc::new(MemoryEngine::new()),
        "rocksdb" => Arc::new(
            RocksEngine::open(&config.storage.data_dir)
                .with_context(|| format!("opening rocksdb at {}", config.storage.data_dir.display()))?,
        ),
        other => anyhow::bail!("unknown engine backend: {}", other),
    };
    info!("engine backend: {}", config.storage.engine);

    let store = Arc::new(Store::open(engine));
    spawn_ttl_sweeper(store.clone(), config.ttl.sweep_interval());

    let addr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.listen_addr))?;
    Server::new(store, addr).run().await?;
    Ok(())
}
