use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Broker connection and protocol errors.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// The transport could not be opened within the connect timeout.
    #[error("failed to connect to broker: {0}")]
    ConnectionFailed(String),

    /// A send was attempted while the connection is down.
    #[error("not connected to broker")]
    NotConnected,

    /// A correlated request got no response within its deadline.
    #[error("request {req_id} timed out after {timeout_secs}s")]
    Timeout { req_id: u64, timeout_secs: u64 },

    /// The connection dropped while the request was outstanding.
    #[error("connection lost while request {req_id} was pending")]
    ConnectionLost { req_id: u64 },

    #[error("authorization failed: {0}")]
    AuthFailed(String),

    /// The broker answered a request with an error payload.
    #[error("broker rejected request: [{code}] {message}")]
    Api { code: String, message: String },
}

/// Execution orchestration errors.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The global enable flag is off; no new proposals are issued.
    #[error("trading is disabled")]
    TradingDisabled,

    /// The gateway has no market price to fill or settle against.
    #[error("no market price available for {symbol}")]
    NoMarketPrice { symbol: String },
}

/// Trade ledger invariant violations.
///
/// These are programming errors surfaced to the caller, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("trade {0} already exists")]
    DuplicateId(String),

    #[error("unknown trade: {0}")]
    UnknownTrade(String),

    #[error("trade {0} is already settled")]
    AlreadyTerminal(String),

    #[error("illegal transition for trade {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: &'static str,
        to: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}
