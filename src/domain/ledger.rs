//! In-memory trade store and state machine.
//!
//! The ledger owns every [`Trade`], split into an active map and a
//! history list. All status transitions go through it; the one-shot
//! terminal guard lives inside the mutation, not in callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use crate::error::LedgerError;

use super::{Trade, TradeId, TradeStatus};

/// Trade store keyed by identifier.
///
/// Not internally synchronized; the owner wraps it in a mutex so inbound
/// settlement and outbound creation never race.
#[derive(Debug, Default)]
pub struct TradeLedger {
    active: HashMap<TradeId, Trade>,
    history: Vec<Trade>,
}

impl TradeLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new trade.
    ///
    /// # Errors
    ///
    /// `DuplicateId` when a trade with the same identifier already exists,
    /// active or settled; `InvalidTransition` when the trade arrives
    /// already terminal.
    pub fn create(&mut self, trade: Trade) -> Result<(), LedgerError> {
        let id = trade.id().clone();
        if self.active.contains_key(&id) || self.find_settled(&id).is_some() {
            return Err(LedgerError::DuplicateId(id.to_string()));
        }
        if trade.status().is_terminal() {
            return Err(LedgerError::InvalidTransition {
                id: id.to_string(),
                from: "new",
                to: trade.status().name(),
            });
        }
        debug!(trade_id = %id, symbol = %trade.symbol(), "Trade created");
        self.active.insert(id, trade);
        Ok(())
    }

    /// Promote a pending trade to active on broker confirmation.
    pub fn confirm(&mut self, id: &TradeId) -> Result<(), LedgerError> {
        let trade = self
            .active
            .get_mut(id)
            .ok_or_else(|| LedgerError::UnknownTrade(id.to_string()))?;
        match trade.status() {
            TradeStatus::Pending => {
                trade.set_status(TradeStatus::Active);
                Ok(())
            }
            status => Err(LedgerError::InvalidTransition {
                id: id.to_string(),
                from: status.name(),
                to: TradeStatus::Active.name(),
            }),
        }
    }

    /// Record a terminal outcome and move the trade to history.
    ///
    /// # Errors
    ///
    /// `UnknownTrade` when no trade with this id exists, `AlreadyTerminal`
    /// when the outcome was recorded before (the second call leaves the
    /// trade untouched), `InvalidTransition` for a non-terminal target
    /// status or a trade that was never confirmed active.
    pub fn settle(
        &mut self,
        id: &TradeId,
        status: TradeStatus,
        result: Decimal,
        exit_price: Option<Decimal>,
    ) -> Result<Trade, LedgerError> {
        if !status.is_terminal() {
            let from = self
                .active
                .get(id)
                .map(|t| t.status().name())
                .unwrap_or("unknown");
            return Err(LedgerError::InvalidTransition {
                id: id.to_string(),
                from,
                to: status.name(),
            });
        }

        let Some(mut trade) = self.active.remove(id) else {
            return if self.find_settled(id).is_some() {
                Err(LedgerError::AlreadyTerminal(id.to_string()))
            } else {
                Err(LedgerError::UnknownTrade(id.to_string()))
            };
        };

        if trade.status() == TradeStatus::Pending {
            self.active.insert(id.clone(), trade);
            return Err(LedgerError::InvalidTransition {
                id: id.to_string(),
                from: TradeStatus::Pending.name(),
                to: status.name(),
            });
        }

        trade.set_status(status);
        trade.record_outcome(Some(result), exit_price);
        debug!(trade_id = %id, status = %status, result = %result, "Trade settled");
        self.history.push(trade.clone());
        Ok(trade)
    }

    /// Cancel an active or pending trade without recording a result.
    ///
    /// Terminal trades have already left the active set, so cancelling one
    /// reports `UnknownTrade`.
    pub fn cancel(&mut self, id: &TradeId) -> Result<(), LedgerError> {
        let Some(mut trade) = self.active.remove(id) else {
            return Err(LedgerError::UnknownTrade(id.to_string()));
        };
        trade.set_status(TradeStatus::Cancelled);
        debug!(trade_id = %id, "Trade cancelled");
        self.history.push(trade);
        Ok(())
    }

    /// Select every active trade whose expiry has passed.
    ///
    /// Selection only: the caller settles each trade once it has learned
    /// the real outcome. Nothing is mutated here.
    #[must_use]
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<Trade> {
        self.active
            .values()
            .filter(|t| t.is_expired(now))
            .cloned()
            .collect()
    }

    /// Look up an active trade.
    #[must_use]
    pub fn get(&self, id: &TradeId) -> Option<&Trade> {
        self.active.get(id)
    }

    /// Number of currently active trades.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// All active trades, cloned for the caller.
    #[must_use]
    pub fn active_trades(&self) -> Vec<Trade> {
        self.active.values().cloned().collect()
    }

    /// Settled and cancelled trades, oldest first.
    #[must_use]
    pub fn history(&self) -> &[Trade] {
        &self.history
    }

    fn find_settled(&self, id: &TradeId) -> Option<&Trade> {
        self.history.iter().find(|t| t.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn make_trade(id: &str, status: TradeStatus, expiry: DateTime<Utc>) -> Trade {
        Trade::new(
            TradeId::from(id),
            "R_100",
            crate::domain::Direction::Call,
            dec!(10),
            dec!(1234.5),
            expiry,
            status,
        )
    }

    fn far_future() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let mut ledger = TradeLedger::new();
        ledger
            .create(make_trade("t1", TradeStatus::Active, far_future()))
            .unwrap();
        let err = ledger
            .create(make_trade("t1", TradeStatus::Active, far_future()))
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateId("t1".into()));
    }

    #[test]
    fn settle_is_one_shot() {
        let mut ledger = TradeLedger::new();
        ledger
            .create(make_trade("t1", TradeStatus::Active, far_future()))
            .unwrap();

        let settled = ledger
            .settle(&TradeId::from("t1"), TradeStatus::Won, dec!(8), None)
            .unwrap();
        assert_eq!(settled.result(), Some(dec!(8)));

        let err = ledger
            .settle(&TradeId::from("t1"), TradeStatus::Lost, dec!(-10), None)
            .unwrap_err();
        assert_eq!(err, LedgerError::AlreadyTerminal("t1".into()));

        // terminal fields untouched by the second call
        let trade = &ledger.history()[0];
        assert_eq!(trade.status(), TradeStatus::Won);
        assert_eq!(trade.result(), Some(dec!(8)));
    }

    #[test]
    fn settle_unknown_trade() {
        let mut ledger = TradeLedger::new();
        let err = ledger
            .settle(&TradeId::from("nope"), TradeStatus::Won, dec!(1), None)
            .unwrap_err();
        assert_eq!(err, LedgerError::UnknownTrade("nope".into()));
    }

    #[test]
    fn settle_rejects_non_terminal_target() {
        let mut ledger = TradeLedger::new();
        ledger
            .create(make_trade("t1", TradeStatus::Active, far_future()))
            .unwrap();
        let err = ledger
            .settle(&TradeId::from("t1"), TradeStatus::Active, dec!(0), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[test]
    fn pending_must_be_confirmed_before_settling() {
        let mut ledger = TradeLedger::new();
        ledger
            .create(make_trade("t1", TradeStatus::Pending, far_future()))
            .unwrap();

        let err = ledger
            .settle(&TradeId::from("t1"), TradeStatus::Won, dec!(8), None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        ledger.confirm(&TradeId::from("t1")).unwrap();
        assert!(ledger
            .settle(&TradeId::from("t1"), TradeStatus::Won, dec!(8), None)
            .is_ok());
    }

    #[test]
    fn confirm_rejects_active_trade() {
        let mut ledger = TradeLedger::new();
        ledger
            .create(make_trade("t1", TradeStatus::Active, far_future()))
            .unwrap();
        let err = ledger.confirm(&TradeId::from("t1")).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[test]
    fn sweep_selects_without_mutating() {
        let mut ledger = TradeLedger::new();
        let past = Utc::now() - Duration::minutes(1);
        ledger
            .create(make_trade("old", TradeStatus::Active, past))
            .unwrap();
        ledger
            .create(make_trade("new", TradeStatus::Active, far_future()))
            .unwrap();

        let expired = ledger.sweep_expired(Utc::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id().as_str(), "old");
        // still active; the sweep settles nothing
        assert_eq!(ledger.active_count(), 2);
    }

    #[test]
    fn cancel_moves_to_history_without_result() {
        let mut ledger = TradeLedger::new();
        ledger
            .create(make_trade("t1", TradeStatus::Active, far_future()))
            .unwrap();
        ledger.cancel(&TradeId::from("t1")).unwrap();

        assert_eq!(ledger.active_count(), 0);
        let trade = &ledger.history()[0];
        assert_eq!(trade.status(), TradeStatus::Cancelled);
        assert_eq!(trade.result(), None);

        // cancelling again: the trade is gone from the active set
        let err = ledger.cancel(&TradeId::from("t1")).unwrap_err();
        assert_eq!(err, LedgerError::UnknownTrade("t1".into()));
    }
}
