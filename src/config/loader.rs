//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{PortalPage, RelayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied on the command line or through the environment.
///
/// They take precedence over the file and are re-applied on every reload.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub whitelist_domains: Option<String>,
    pub portal_page: Option<PortalPage>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(bind) = &self.bind_address {
            config.listener.bind_address = bind.clone();
        }
        if let Some(domains) = &self.whitelist_domains {
            config.access.whitelist_domains = domains.clone();
        }
        if let Some(page) = self.portal_page {
            config.portal.page = page;
        }
    }
}

/// Load a TOML file, apply overrides and validate the result.
pub fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: RelayConfig = toml::from_str(&content)?;
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration without a file: defaults plus overrides.
pub fn default_config(overrides: &ConfigOverrides) -> Result<RelayConfig, ConfigError> {
    let mut config = RelayConfig::default();
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
