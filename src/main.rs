//! relay-proxy
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                      RELAY                        │
//!   Client Request     │  ┌──────────┐   ┌──────────┐   ┌─────────────┐   │
//!   ───────────────────┼─▶│ routing  │──▶│ security │──▶│   forward   │───┼──▶ Origin
//!                      │  │ (target) │   │ (allow)  │   │  (reqwest)  │   │
//!                      │  └──────────┘   └──────────┘   └──────┬──────┘   │
//!                      │                                        │          │
//!   Client Response    │               ┌────────────────┐       │          │
//!   ◀──────────────────┼───────────────│    response    │◀──────┘          │
//!                      │               │ (redirect/html)│                  │
//!                      │               └────────────────┘                  │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use relay_proxy::config::{ConfigOverrides, PortalPage};
use relay_proxy::lifecycle::startup::{self, StartupOptions};
use relay_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "relay-proxy", version)]
#[command(about = "HTTP forwarding relay with a domain allow-list and link rewriting", long_about = None)]
struct Cli {
    /// TOML configuration file, watched for changes
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080
    #[arg(short, long, env = "RELAY_BIND")]
    bind: Option<String>,

    /// Comma-separated allowed destination domains; empty allows all
    #[arg(long, env = "WHITELIST_DOMAINS")]
    whitelist_domains: Option<String>,

    /// Page served at `/`: portal.html or nginx.html
    #[arg(long, env = "PORTAL_PAGE")]
    portal_page: Option<String>,
}

impl Cli {
    fn into_options(self) -> StartupOptions {
        StartupOptions {
            config_path: self.config,
            overrides: ConfigOverrides {
                bind_address: self.bind,
                whitelist_domains: self.whitelist_domains,
                portal_page: self.portal_page.map(PortalPage::from),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Cli::parse().into_options();

    let config = match startup::initial_config(&options) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("relay-proxy: {}", e);
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        allow_list = %config.access.whitelist_domains,
        portal_page = config.portal.page.file_name(),
        "Configuration loaded"
    );

    startup::run(config, &options).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
