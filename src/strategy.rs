//! Signal source port.
//!
//! The engine consumes signals from any [`Strategy`]; indicator math
//! lives with the strategy author, not here. One deliberately simple
//! tick-momentum implementation ships so the binary runs end to end.
//! It is a placeholder at this boundary, not trading advice.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::domain::{Direction, Signal};

/// Rolling view of recent market prices for one symbol, oldest first.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub ticks: Vec<Decimal>,
}

impl MarketSnapshot {
    #[must_use]
    pub fn current_price(&self) -> Option<Decimal> {
        self.ticks.last().copied()
    }
}

/// Produces trade signals from market snapshots.
pub trait Strategy: Send {
    /// Evaluate the snapshot for `asset`; `None` means hold.
    fn generate_signal(&mut self, market: &MarketSnapshot, asset: &str) -> Option<Signal>;

    /// Strategy name for logging.
    fn name(&self) -> &'static str;
}

/// Follows short-term tick direction: a run of mostly rising ticks
/// signals CALL, mostly falling PUT.
pub struct TickMomentum {
    lookback: usize,
    min_confidence: f64,
    expiry_minutes: u32,
}

impl TickMomentum {
    #[must_use]
    pub fn new(lookback: usize, min_confidence: f64, expiry_minutes: u32) -> Self {
        Self {
            lookback,
            min_confidence,
            expiry_minutes,
        }
    }
}

impl Strategy for TickMomentum {
    fn generate_signal(&mut self, market: &MarketSnapshot, asset: &str) -> Option<Signal> {
        if market.ticks.len() <= self.lookback {
            return None;
        }

        let window = &market.ticks[market.ticks.len() - self.lookback - 1..];
        let mut ups = 0usize;
        let mut downs = 0usize;
        for pair in window.windows(2) {
            if pair[1] > pair[0] {
                ups += 1;
            } else if pair[1] < pair[0] {
                downs += 1;
            }
        }

        let moves = ups + downs;
        if moves == 0 {
            return None;
        }

        let (direction, dominant) = if ups >= downs {
            (Direction::Call, ups)
        } else {
            (Direction::Put, downs)
        };
        let confidence = dominant as f64 / moves as f64;
        if confidence < self.min_confidence {
            return None;
        }

        let current_price = market.current_price()?;
        let mut indicators = HashMap::new();
        indicators.insert("current_price".to_string(), current_price);
        indicators.insert(
            "momentum".to_string(),
            Decimal::from(ups as i64 - downs as i64),
        );

        Some(Signal {
            direction,
            asset: asset.to_string(),
            timestamp: Utc::now(),
            confidence,
            indicators,
            expiry_minutes: self.expiry_minutes,
        })
    }

    fn name(&self) -> &'static str {
        "tick-momentum"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rising(n: usize) -> MarketSnapshot {
        MarketSnapshot {
            ticks: (0..n).map(|i| Decimal::from(100 + i as i64)).collect(),
        }
    }

    #[test]
    fn needs_enough_history() {
        let mut strategy = TickMomentum::new(10, 0.6, 5);
        assert!(strategy.generate_signal(&rising(5), "R_100").is_none());
    }

    #[test]
    fn steady_rise_signals_call() {
        let mut strategy = TickMomentum::new(10, 0.6, 5);
        let signal = strategy.generate_signal(&rising(20), "R_100").unwrap();
        assert_eq!(signal.direction, Direction::Call);
        assert_eq!(signal.current_price(), Some(dec!(119)));
        assert!(signal.confidence >= 0.6);
    }

    #[test]
    fn choppy_market_holds() {
        let mut strategy = TickMomentum::new(10, 0.9, 5);
        let mut ticks = Vec::new();
        for i in 0..20 {
            ticks.push(if i % 2 == 0 { dec!(100) } else { dec!(101) });
        }
        let snapshot = MarketSnapshot { ticks };
        assert!(strategy.generate_signal(&snapshot, "R_100").is_none());
    }
}
