use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::rdf::TransformSpec;

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) server: ServerConfig,
    pub(crate) polling: PollingConfig,
    pub(crate) namespaces: Vec<NamespaceConfig>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub(crate) http_port: u16,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct PollingConfig {
    pub(crate) interval_ms: u64,
    pub(crate) initial_delay_ms: u64,
    pub(crate) fetch_timeout_ms: u64,
}

/// One `[[namespaces]]` entry.
#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct NamespaceConfig {
    pub(crate) key: String,
    pub(crate) uri: String,
    /// Local name of the predicate that orders records of this namespace
    pub(crate) sorting: Option<String>,
    pub(crate) transforms: BTreeMap<String, TransformSpec>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 60_000,
            initial_delay_ms: 1_000,
            fetch_timeout_ms: 10_000,
        }
    }
}

impl PollingConfig {
    pub(crate) fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub(crate) fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub(crate) fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.interval_ms > 0, "polling.interval_ms must be positive");
        ensure!(self.fetch_timeout_ms > 0, "polling.fetch_timeout_ms must be positive");
        Ok(())
    }
}

impl Config {
    pub(crate) fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config
            .polling
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }
}
