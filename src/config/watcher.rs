//! Configuration file watcher for hot reload.
//!
//! A change event reloads the file, re-applies the command line overrides
//! and sends the validated result to the server. A file that fails to load
//! is logged and skipped; the running configuration stays in place.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigOverrides};
use crate::config::schema::RelayConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    overrides: ConfigOverrides,
    updates: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(
        path: &Path,
        overrides: ConfigOverrides,
    ) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (updates, receiver) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            overrides,
            updates,
        };
        (watcher, receiver)
    }

    /// Start watching. Updates flow only while the returned handle lives.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();
        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) => {
                self.on_event(&event);
            }
            Err(e) => tracing::error!(error = ?e, "Config watch error"),
        };

        let mut watcher =
            RecommendedWatcher::new(handler, Config::default().with_poll_interval(POLL_INTERVAL))?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }

    /// Reload on modify/create. Returns whether a new config was sent.
    fn on_event(&self, event: &Event) -> bool {
        if !(event.kind.is_modify() || event.kind.is_create()) {
            return false;
        }

        tracing::info!(path = ?self.path, "Config file changed, reloading");
        match load_config(&self.path, &self.overrides) {
            Ok(config) => self.updates.send(config).is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "Reload failed, keeping current configuration");
                false
            }
        }
    }
}
