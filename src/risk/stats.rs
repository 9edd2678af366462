//! Rolling risk statistics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome tag of the most recent settled trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LastResult {
    Win,
    Loss,
}

/// Per-day trade statistics, keyed by calendar date.
///
/// Exactly one instance is current at a time; it resets the first time
/// any operation observes a different date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRiskStats {
    pub date: NaiveDate,
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub profit: Decimal,
    pub loss: Decimal,
    pub consecutive_wins: u32,
    pub consecutive_losses: u32,
    pub last_result: Option<LastResult>,
}

impl DailyRiskStats {
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date,
            trades: 0,
            wins: 0,
            losses: 0,
            profit: Decimal::ZERO,
            loss: Decimal::ZERO,
            consecutive_wins: 0,
            consecutive_losses: 0,
            last_result: None,
        }
    }

    /// Fraction of settled trades today that won, zero with no trades.
    #[must_use]
    pub fn win_rate(&self) -> Decimal {
        let total = self.wins + self.losses;
        if total == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.wins) / Decimal::from(total)
    }

    /// True once at least one trade has settled today.
    #[must_use]
    pub fn has_settled_trades(&self) -> bool {
        self.wins + self.losses > 0
    }
}

/// Account balance and its historical peak.
///
/// The high-water mark never decreases; drawdown is measured against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub balance: Decimal,
    pub high_water_mark: Decimal,
}

impl AccountState {
    #[must_use]
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance,
            high_water_mark: balance,
        }
    }

    /// Apply a settled result, raising the high-water mark when exceeded.
    pub fn apply(&mut self, result: Decimal) {
        self.balance += result;
        if self.balance > self.high_water_mark {
            self.high_water_mark = self.balance;
        }
    }

    /// Percentage decline from the peak, in [0, 100].
    #[must_use]
    pub fn drawdown_percent(&self) -> Decimal {
        if self.high_water_mark <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.high_water_mark - self.balance) / self.high_water_mark * Decimal::ONE_HUNDRED
    }
}

/// One settled trade result, appended to the audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub result: Decimal,
    pub stake: Decimal,
    pub balance_after: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn high_water_mark_never_decreases() {
        let mut account = AccountState::new(dec!(1000));
        account.apply(dec!(50));
        assert_eq!(account.high_water_mark, dec!(1050));
        account.apply(dec!(-200));
        assert_eq!(account.balance, dec!(850));
        assert_eq!(account.high_water_mark, dec!(1050));
        assert!(account.high_water_mark >= account.balance);
    }

    #[test]
    fn drawdown_measured_from_peak() {
        let mut account = AccountState::new(dec!(1000));
        account.apply(dec!(-100));
        assert_eq!(account.drawdown_percent(), dec!(10));
    }

    #[test]
    fn win_rate_is_zero_without_trades() {
        let stats = DailyRiskStats::for_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(stats.win_rate(), Decimal::ZERO);
        assert!(!stats.has_settled_trades());
    }
}
