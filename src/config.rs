//! Configuration management for the bridge node
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub custody: CustodyConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Identifier of the chain this ledger serves
    pub chain_id: u64,
    /// Bridged token
    pub token: Address,
    /// Only identity whose attestations release value
    pub validator: Address,
    /// Identity allowed to enable and disable destination chains
    pub admin: Address,
    /// Destination chains enabled at startup
    #[serde(default)]
    pub enabled_chains: Vec<u64>,
    /// Events retained for `/events` queries, also the live channel capacity
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_event_buffer() -> usize {
    1024
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustodyConfig {
    /// Balances seeded into the in-memory custody at startup
    #[serde(default)]
    pub genesis: Vec<GenesisBalance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenesisBalance {
    pub account: Address,
    pub amount: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Bind address; loopback unless set explicitly
    #[serde(default = "default_api_host")]
    pub host: String,
    pub port: u16,
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Settings {
    /// Load settings from the file named by `BRIDGE_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("BRIDGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str)?;

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.bridge.chain_id == 0 {
            anyhow::bail!("bridge.chain_id must be non-zero");
        }

        if self.bridge.validator.is_zero() {
            anyhow::bail!("bridge.validator must be set");
        }

        if self.bridge.enabled_chains.contains(&self.bridge.chain_id) {
            anyhow::bail!(
                "bridge.enabled_chains cannot contain the own chain id {}",
                self.bridge.chain_id
            );
        }

        if self.bridge.event_buffer == 0 {
            anyhow::bail!("bridge.event_buffer must be positive");
        }

        if self.bridge.enabled_chains.is_empty() {
            tracing::warn!("No destination chains enabled - swaps will be rejected");
        }

        Ok(())
    }

    /// Genesis balances as custody entries
    pub fn genesis_balances(&self) -> Vec<(Address, U256)> {
        self.custody
            .genesis
            .iter()
            .map(|g| (g.account, U256::from(g.amount)))
            .collect()
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")?;

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    Ok(result)
}
