//! Shared helpers for integration tests.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use stakeout::domain::{Direction, Signal};

/// Build a signal with `current_price` set, the way a strategy would.
pub fn signal(direction: Direction, asset: &str, price: Decimal) -> Signal {
    let mut indicators = HashMap::new();
    indicators.insert("current_price".to_string(), price);
    Signal {
        direction,
        asset: asset.to_string(),
        timestamp: Utc::now(),
        confidence: 0.8,
        indicators,
        expiry_minutes: 5,
    }
}
