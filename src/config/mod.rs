//! Configuration management for the phase follower.
//!
//! Loads settings from environment variables and config files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Child order splitting parameters
    #[serde(default)]
    pub stealth: StealthConfig,
    /// Position protection settings
    #[serde(default)]
    pub protection: ProtectionConfig,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Plan storage settings
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StealthConfig {
    /// Minimum number of child orders per stealth batch
    #[serde(default = "default_min_child_orders")]
    pub min_child_orders: u64,
    /// Maximum number of child orders per stealth batch
    #[serde(default = "default_max_child_orders")]
    pub max_child_orders: u64,
    /// Smallest share of the remaining balance a child order takes (basis points)
    #[serde(default = "default_min_slice_bps")]
    pub min_slice_bps: u64,
    /// Largest share of the remaining balance a child order takes (basis points)
    #[serde(default = "default_max_slice_bps")]
    pub max_slice_bps: u64,
    /// Minimum delay between child orders in seconds
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    /// Maximum delay between child orders in seconds
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionConfig {
    /// Maximum number of escalating decisions kept in the alert log
    #[serde(default = "default_alert_log_capacity")]
    pub alert_log_capacity: usize,
    /// Buffer size of the outbound risk coordinator channel
    #[serde(default = "default_coordinator_channel_capacity")]
    pub coordinator_channel_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
    /// Directory for hourly rolling log files (stdout only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database for active plans (in-memory plans when unset)
    #[serde(default)]
    pub plan_db_path: Option<String>,
}

// Default value functions
fn default_min_child_orders() -> u64 {
    2
}

fn default_max_child_orders() -> u64 {
    4
}

fn default_min_slice_bps() -> u64 {
    2000 // 20% of the remaining balance
}

fn default_max_slice_bps() -> u64 {
    4000 // 40% of the remaining balance
}

fn default_min_delay_secs() -> u64 {
    60
}

fn default_max_delay_secs() -> u64 {
    300
}

fn default_alert_log_capacity() -> usize {
    10_000
}

fn default_coordinator_channel_capacity() -> usize {
    256
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("PF"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        let stealth = &self.stealth;

        anyhow::ensure!(
            stealth.min_child_orders >= 2 && stealth.min_child_orders <= stealth.max_child_orders,
            "min_child_orders must be >= 2 and <= max_child_orders"
        );

        anyhow::ensure!(
            stealth.min_slice_bps > 0
                && stealth.min_slice_bps <= stealth.max_slice_bps
                && stealth.max_slice_bps < 10_000,
            "slice bps must satisfy 0 < min <= max < 10000"
        );

        anyhow::ensure!(
            stealth.min_delay_secs <= stealth.max_delay_secs,
            "min_delay_secs must be <= max_delay_secs"
        );

        anyhow::ensure!(
            self.protection.alert_log_capacity > 0,
            "alert_log_capacity must be positive"
        );

        anyhow::ensure!(
            self.protection.coordinator_channel_capacity > 0,
            "coordinator_channel_capacity must be positive"
        );

        Ok(())
    }
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            min_child_orders: default_min_child_orders(),
            max_child_orders: default_max_child_orders(),
            min_slice_bps: default_min_slice_bps(),
            max_slice_bps: default_max_slice_bps(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
        }
    }
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            alert_log_capacity: default_alert_log_capacity(),
            coordinator_channel_capacity: default_coordinator_channel_capacity(),
        }
    }
}
