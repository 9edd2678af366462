//! Trading signals produced by the strategy collaborator.
//!
//! The engine treats signal generation as an opaque producer; only the
//! shape of the signal is defined here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::Direction;

/// A proposed entry emitted by a strategy.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Trade direction.
    pub direction: Direction,
    /// Symbol the signal applies to.
    pub asset: String,
    /// When the signal was generated.
    pub timestamp: DateTime<Utc>,
    /// Strategy confidence in [0, 1]. Not validated here.
    pub confidence: f64,
    /// Indicator snapshot at signal time. Always includes `current_price`.
    pub indicators: HashMap<String, Decimal>,
    /// Contract expiry, in minutes from execution.
    pub expiry_minutes: u32,
}

impl Signal {
    /// The market price observed when the signal fired, if present.
    #[must_use]
    pub fn current_price(&self) -> Option<Decimal> {
        self.indicators.get("current_price").copied()
    }
}
