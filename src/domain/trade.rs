//! Trade types for the binary options lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique trade identifier.
///
/// The inner string is private so all construction goes through the
/// defined constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TradeId(String);

impl TradeId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TradeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contract direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    /// Wire name used in proposal requests.
    #[must_use]
    pub fn contract_type(&self) -> &'static str {
        match self {
            Direction::Call => "CALL",
            Direction::Put => "PUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_type())
    }
}

/// Status of a trade.
///
/// `Pending` covers the brief window between order submission and broker
/// confirmation. Won/Lost/Cancelled are terminal and one-shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Active,
    Won,
    Lost,
    Cancelled,
}

impl TradeStatus {
    /// Returns true once no further transition is legal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Won | TradeStatus::Lost | TradeStatus::Cancelled
        )
    }

    /// Short name used in errors and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TradeStatus::Pending => "pending",
            TradeStatus::Active => "active",
            TradeStatus::Won => "won",
            TradeStatus::Lost => "lost",
            TradeStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single binary option trade.
///
/// Owned by the ledger; everything else refers to it by id and mutates it
/// only through the ledger's transition operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    id: TradeId,
    symbol: String,
    direction: Direction,
    stake: Decimal,
    entry_price: Decimal,
    expiry: DateTime<Utc>,
    status: TradeStatus,
    result: Option<Decimal>,
    exit_price: Option<Decimal>,
}

impl Trade {
    #[must_use]
    pub fn new(
        id: TradeId,
        symbol: impl Into<String>,
        direction: Direction,
        stake: Decimal,
        entry_price: Decimal,
        expiry: DateTime<Utc>,
        status: TradeStatus,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            direction,
            stake,
            entry_price,
            expiry,
            status,
            result: None,
            exit_price: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &TradeId {
        &self.id
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub fn stake(&self) -> Decimal {
        self.stake
    }

    #[must_use]
    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    #[must_use]
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    #[must_use]
    pub fn status(&self) -> TradeStatus {
        self.status
    }

    #[must_use]
    pub fn result(&self) -> Option<Decimal> {
        self.result
    }

    #[must_use]
    pub fn exit_price(&self) -> Option<Decimal> {
        self.exit_price
    }

    /// True once the trade's expiry timestamp has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    pub(crate) fn set_status(&mut self, status: TradeStatus) {
        self.status = status;
    }

    pub(crate) fn record_outcome(&mut self, result: Option<Decimal>, exit_price: Option<Decimal>) {
        self.result = result;
        self.exit_price = exit_price;
    }
}
