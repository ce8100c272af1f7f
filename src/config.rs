//! Configuration management for walletdeck
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub node: NodeConfig,
    pub wallet: WalletConfig,
    pub poller: PollerConfig,
    pub watcher: WatcherConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub explorer: ExplorerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// RPC endpoint; empty or absent means no provider is available
    #[serde(default)]
    pub rpc_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Name of the environment variable holding the signer key
    pub private_key_env: String,
    /// Where to send the user when no provider is available
    pub install_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
    pub confirm_display_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerConfig {
    /// Transaction URL template base; the hash is appended verbatim
    pub tx_url: String,
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("WALLETDECK_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.poller.interval_secs == 0 {
            anyhow::bail!("poller.interval_secs must be greater than zero");
        }
        if self.watcher.receipt_poll_interval_ms == 0 {
            anyhow::bail!("watcher.receipt_poll_interval_ms must be greater than zero");
        }
        if self.watcher.receipt_timeout_secs == 0 {
            anyhow::bail!("watcher.receipt_timeout_secs must be greater than zero");
        }
        if !self.node.rpc_url.is_empty() && !self.node.rpc_url.starts_with("http") {
            anyhow::bail!("node.rpc_url must be an http(s) endpoint");
        }
        if self.explorer.tx_url.is_empty() {
            anyhow::bail!("explorer.tx_url must be configured");
        }

        Ok(())
    }

    /// Whether an RPC endpoint is configured at all
    pub fn has_node(&self) -> bool {
        !self.node.rpc_url.is_empty()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poller.interval_secs)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.watcher.receipt_poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.watcher.receipt_timeout_secs)
    }

    pub fn confirm_display_delay(&self) -> Duration {
        Duration::from_secs(self.watcher.confirm_display_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.node.request_timeout_secs)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}
