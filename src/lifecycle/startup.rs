//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Start the metrics exporter and the config watcher
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::loader::{default_config, load_config};
use crate::config::watcher::ConfigWatcher;
use crate::config::{ConfigError, ConfigOverrides, RelayConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::tls::load_tls_config;
use crate::observability::metrics;

/// Errors that stop the relay from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("invalid address '{0}'")]
    Address(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the command line asked for.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

/// Load the initial configuration from file or defaults.
pub fn initial_config(options: &StartupOptions) -> Result<RelayConfig, ConfigError> {
    match &options.config_path {
        Some(path) => load_config(path, &options.overrides),
        None => default_config(&options.overrides),
    }
}

/// Serve until SIGINT/SIGTERM.
pub async fn run(config: RelayConfig, options: &StartupOptions) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    // The watcher stops when dropped, so it lives until serving ends.
    let (_watcher, config_updates) = match &options.config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, options.overrides.clone());
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let server = HttpServer::new(config.clone())?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let signal_task = tokio::spawn(async move {
        signals::wait_for_shutdown_signal().await;
        shutdown.trigger();
    });

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config
                .listener
                .bind_address
                .parse()
                .map_err(|_| StartupError::Address(config.listener.bind_address.clone()))?;
            let rustls = load_tls_config(tls).await?;
            server.run_tls(addr, rustls, config_updates, server_shutdown).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, server_shutdown).await?;
        }
    }

    signal_task.abort();
    Ok(())
}
