//! Server configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `CANTRIP_*` environment variables.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `CANTRIP_BIND_ADDR`
pub const ENV_PREFIX: &str = "CANTRIP_";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// None = in-memory
    pub db_path: Option<String>,
    /// Lifetime of an unfinished wizard or resolution
    pub interaction_timeout_secs: u64,
    /// Characters allowed per owner
    pub max_characters: usize,
    pub sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            db_path: None,
            interaction_timeout_secs: 900,
            max_characters: 5,
            sweep_interval_secs: 60,
        }
    }
}

impl Config {
    /// Merge defaults, the optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("config file {} not found", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }
        let config = figment.merge(Env::prefixed(ENV_PREFIX)).extract()?;
        Ok(config)
    }

    pub fn interaction_timeout(&self) -> Duration {
        Duration::from_secs(self.interaction_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
