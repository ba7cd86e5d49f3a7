//! Configuration management for the deployer
//!
//! Loads configuration from TOML files with environment variable substitution.
//! One file describes every network the contract can be deployed to; the
//! active one is picked by `active_network` or `DEPLOYER_NETWORK`.

use anyhow::{Context, Result};
use ethers::types::Address;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

lazy_static! {
    static ref ENV_VAR_PATTERN: Regex = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub active_network: String,
    pub networks: HashMap<String, NetworkConfig>,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    pub contract: ContractConfig,
}

/// Where and as whom transactions are sent
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub endpoint_url: String,
    pub chain_id: u64,
    pub sender_address: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the hex private key
    pub private_key_env: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            private_key_env: "PRIVATE_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Solidity source on disk
    pub source_path: PathBuf,
    /// Source unit name used inside the compiler input and output
    pub file_name: String,
    pub contract_name: String,
    pub compiler_version: String,
    /// Explicit `solc` binary; when unset `compiler_version` is installed through svm
    #[serde(default)]
    pub solc_path: Option<PathBuf>,
    /// Compiler output is written here and reloaded when `compile` is off
    pub artifact_path: PathBuf,
    #[serde(default = "default_compile")]
    pub compile: bool,
    pub stored_value: u64,
}

fn default_compile() -> bool {
    true
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("DEPLOYER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let mut settings = Self::parse(&config_str)?;

        if let Ok(network) = env::var("DEPLOYER_NETWORK") {
            settings.active_network = network;
        }

        settings.validate()?;

        Ok(settings)
    }

    /// Parse settings from TOML text, substituting `${VAR}` placeholders
    pub fn parse(config_str: &str) -> Result<Self> {
        let config_str = substitute_env_vars(config_str);

        toml::from_str(&config_str).with_context(|| "Failed to parse configuration")
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        let network = self.network()?;

        if network.endpoint_url.is_empty() {
            anyhow::bail!(
                "Network {} has no endpoint URL configured",
                self.active_network
            );
        }
        if network.sender_address.is_zero() {
            anyhow::bail!("Network {} has no sender address", self.active_network);
        }
        if self.confirmation.poll_interval_ms == 0 {
            tracing::warn!("Receipt poll interval is 0 ms - the node will be polled back to back");
        }

        Ok(())
    }

    /// Get the network selected for this run
    pub fn network(&self) -> Result<&NetworkConfig> {
        self.networks.get(&self.active_network).with_context(|| {
            format!(
                "Network {} is not configured (known: {:?})",
                self.active_network,
                self.networks.keys().collect::<Vec<_>>()
            )
        })
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
