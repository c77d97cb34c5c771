mod config;
mod counter;
#[cfg(feature = "rocksdb")]
mod encoding;
mod handler;
mod protocol;
mod server;
mod store;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, LogConfig, StoreBackend};
use counter::LikeCounter;
use handler::LikeHandler;
use server::Server;

/// Like counter service
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
  /// Path to a TOML configuration file
  #[arg(short, long)]
  config: Option<String>,

  /// Override the HTTP listening address
  #[arg(long)]
  addr: Option<String>,

  /// Override the log level
  #[arg(long)]
  log_level: Option<String>,
}

fn init_logging(log: &LogConfig) -> anyhow::Result<()> {
  // RUST_LOG wins over the configured level
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .with_thread_ids(true)
    .with_file(true)
    .with_line_number(true);

  match &log.file {
    Some(path) => {
      let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path))?;
      builder.with_ansi(false).with_writer(Mutex::new(file)).init();
    }
    None => builder.init(),
  }
  Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  let mut config = match &args.config {
    Some(path) => Config::from_file(path)?,
    None => Config::default(),
  };
  if let Some(addr) = args.addr {
    config.server_addr = addr;
  }
  if let Some(level) = args.log_level {
    config.log.level = level;
  }

  init_logging(&config.log)?;

  info!("Starting like-counter");
  info!("Version: {}", env!("CARGO_PKG_VERSION"));

  let store = store::open(&config.store, &[config.counter.table.as_str()])
    .context("Failed to open store")?;
  let counter = LikeCounter::new(store, config.counter.clone());

  // An in-memory store starts empty, so there is nothing provisioned out of band
  if config.counter.provision || config.store.backend == StoreBackend::Memory {
    counter
      .provision(config.counter.initial_count)
      .await
      .context("Failed to provision counter")?;
  }

  let handler = Arc::new(LikeHandler::new(counter));
  let server = Server::bind(&config.server_addr, &config.route, handler)
    .await
    .with_context(|| format!("Failed to bind {}", config.server_addr))?;
  info!("Serving {} on: {}", config.route, server.local_addr());

  server.run().await?;

  Ok(())
}
