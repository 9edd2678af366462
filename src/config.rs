//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with an environment variable
//! override for the API token (`BROKER_API_TOKEN`), which is never read
//! from the config file.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub reconnection: ReconnectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;

        let mut config: Self = toml::from_str(&content).map_err(ConfigError::Parse)?;

        // Load the API token from the environment (never from the config file)
        config.broker.api_token = std::env::var("BROKER_API_TOKEN").ok();

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.broker.ws_url.is_empty() {
            return Err(ConfigError::MissingField { field: "ws_url" }.into());
        }
        if self.broker.app_id.is_empty() {
            return Err(ConfigError::MissingField { field: "app_id" }.into());
        }
        url::Url::parse(&self.broker.ws_url)?;
        if self.risk.base_stake_percent <= Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "base_stake_percent",
                reason: "must be positive".into(),
            }
            .into());
        }
        if self.risk.min_stake > self.risk.max_stake {
            return Err(ConfigError::InvalidValue {
                field: "min_stake",
                reason: format!("exceeds max_stake ({})", self.risk.max_stake),
            }
            .into());
        }
        Ok(())
    }
}

/// Broker connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// WebSocket endpoint of the broker API.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Application identifier appended to the endpoint.
    #[serde(default = "default_app_id")]
    pub app_id: String,
    /// API token, loaded from `BROKER_API_TOKEN`. Without a token the
    /// connection stays unauthenticated (read-only market data).
    #[serde(skip)]
    pub api_token: Option<String>,
    /// Account currency used in proposal requests.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Seconds to wait for the connection to open.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds to wait for a correlated response before eviction.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl BrokerConfig {
    /// Full endpoint URL including the app id query parameter.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}?app_id={}", self.ws_url, self.app_id)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            app_id: default_app_id(),
            api_token: None,
            currency: default_currency(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_ws_url() -> String {
    "wss://ws.derivws.com/websockets/v3".into()
}

fn default_app_id() -> String {
    "1089".into()
}

fn default_currency() -> String {
    "USD".into()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    5
}

/// Trading loop configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Symbols to trade.
    #[serde(default)]
    pub assets: Vec<String>,
    /// Paper mode: simulated fills, no live orders.
    #[serde(default = "default_paper")]
    pub paper: bool,
    /// Seconds between strategy evaluations.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Seconds between settlement sweeps of expired trades.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Contract expiry for new trades, in minutes.
    #[serde(default = "default_expiry_minutes")]
    pub default_expiry_minutes: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            paper: default_paper(),
            check_interval_secs: default_check_interval_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            default_expiry_minutes: default_expiry_minutes(),
        }
    }
}

fn default_paper() -> bool {
    true
}

fn default_check_interval_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    15
}

fn default_expiry_minutes() -> u32 {
    5
}

/// Risk limits and capital management parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Starting account balance when no persisted state exists.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Decimal,
    /// Maximum cumulative loss per calendar day.
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Maximum number of trades per calendar day.
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,
    /// Maximum consecutive losing trades before trading halts.
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: u32,
    /// Maximum drawdown from the high-water mark, in percent.
    #[serde(default = "default_max_drawdown_percent")]
    pub max_drawdown_percent: Decimal,
    /// Balance floor below which no trades execute.
    #[serde(default = "default_min_balance")]
    pub min_balance: Decimal,
    /// Base stake as a percentage of the current balance.
    #[serde(default = "default_base_stake_percent")]
    pub base_stake_percent: Decimal,
    /// Hard cap on a single stake as a percentage of the balance.
    #[serde(default = "default_max_stake_percent")]
    pub max_stake_percent: Decimal,
    /// Smallest stake the broker accepts.
    #[serde(default = "default_min_stake")]
    pub min_stake: Decimal,
    /// Largest stake allowed per trade.
    #[serde(default = "default_max_stake")]
    pub max_stake: Decimal,
    /// Where the risk state snapshot is persisted.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
            max_daily_loss: default_max_daily_loss(),
            max_daily_trades: default_max_daily_trades(),
            max_consecutive_losses: default_max_consecutive_losses(),
            max_drawdown_percent: default_max_drawdown_percent(),
            min_balance: default_min_balance(),
            base_stake_percent: default_base_stake_percent(),
            max_stake_percent: default_max_stake_percent(),
            min_stake: default_min_stake(),
            max_stake: default_max_stake(),
            state_file: default_state_file(),
        }
    }
}

fn default_initial_balance() -> Decimal {
    Decimal::from(1000)
}

fn default_max_daily_loss() -> Decimal {
    Decimal::from(100)
}

fn default_max_daily_trades() -> u32 {
    50
}

fn default_max_consecutive_losses() -> u32 {
    5
}

fn default_max_drawdown_percent() -> Decimal {
    Decimal::from(20)
}

fn default_min_balance() -> Decimal {
    Decimal::from(100)
}

fn default_base_stake_percent() -> Decimal {
    Decimal::from(2)
}

fn default_max_stake_percent() -> Decimal {
    Decimal::from(5)
}

fn default_min_stake() -> Decimal {
    Decimal::ONE
}

fn default_max_stake() -> Decimal {
    Decimal::from(100)
}

fn default_state_file() -> PathBuf {
    PathBuf::from("risk_state.json")
}

/// Reconnection backoff configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectionConfig {
    /// Initial delay before the first reconnection attempt (milliseconds).
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Maximum delay between reconnection attempts (milliseconds).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for ReconnectionConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Initialize the tracing subscriber with this logging configuration.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let config = Config {
            broker: BrokerConfig::default(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_stake_bounds() {
        let mut config = Config::default();
        config.risk.min_stake = Decimal::from(200);
        assert!(config.validate().is_err());
    }

    #[test]
    fn endpoint_appends_app_id() {
        let broker = BrokerConfig::default();
        assert!(broker.endpoint().ends_with("?app_id=1089"));
    }
}
