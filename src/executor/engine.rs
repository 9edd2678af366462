//! Execution orchestration.
//!
//! Combines the risk engine, the trade ledger and an order gateway into
//! the propose/settle/cancel operations. The gateway decides how orders
//! reach a venue; this engine decides whether they may, and keeps the
//! books straight afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::domain::{Signal, Trade, TradeId, TradeLedger, TradeStatus};
use crate::error::{BrokerError, ExecutionError, LedgerError, Result};
use crate::risk::{DailySummary, RiskEngine, RiskMetrics};

use super::{OrderGateway, OrderTicket};

/// Risk-gated trade execution engine.
pub struct TradeEngine {
    gateway: Arc<dyn OrderGateway>,
    ledger: Mutex<TradeLedger>,
    risk: Mutex<RiskEngine>,
    enabled: AtomicBool,
}

impl TradeEngine {
    #[must_use]
    pub fn new(gateway: Arc<dyn OrderGateway>, risk: RiskEngine) -> Self {
        Self {
            gateway,
            ledger: Mutex::new(TradeLedger::new()),
            risk: Mutex::new(risk),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn enable_trading(&self) {
        self.enabled.store(true, Ordering::SeqCst);
        info!("Trading enabled");
    }

    pub fn disable_trading(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        info!("Trading disabled");
    }

    #[must_use]
    pub fn is_trading_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Gate a signal through the risk engine and, on approval, execute
    /// it through the gateway and record the resulting trade.
    ///
    /// A risk rejection is not an error: it returns `None` with the
    /// blocking reasons logged.
    ///
    /// # Errors
    ///
    /// `TradingDisabled` when the enable flag is off, `NotConnected`
    /// when the gateway cannot reach its venue, or any gateway/ledger
    /// failure during execution.
    pub async fn propose_and_execute(&self, signal: &Signal) -> Result<Option<Trade>> {
        self.propose_and_execute_at(signal, Utc::now()).await
    }

    /// Clock-injected variant of [`Self::propose_and_execute`].
    pub async fn propose_and_execute_at(
        &self,
        signal: &Signal,
        now: DateTime<Utc>,
    ) -> Result<Option<Trade>> {
        if !self.is_trading_enabled() {
            return Err(ExecutionError::TradingDisabled.into());
        }
        if !self.gateway.is_connected() {
            return Err(BrokerError::NotConnected.into());
        }

        let decision = self.risk.lock().can_execute_at(None, now);
        if !decision.is_approved() {
            info!(
                asset = %signal.asset,
                reasons = ?decision.reasons,
                "Signal rejected by risk engine"
            );
            return Ok(None);
        }

        let ticket = OrderTicket {
            symbol: signal.asset.clone(),
            direction: signal.direction,
            stake: decision.stake,
            expiry_minutes: signal.expiry_minutes,
            entry_hint: signal.current_price(),
        };

        let confirmation = self.gateway.place_order(&ticket).await?;

        let trade = Trade::new(
            TradeId::from(confirmation.contract_id.as_str()),
            ticket.symbol,
            ticket.direction,
            ticket.stake,
            confirmation.entry_price,
            now + Duration::minutes(i64::from(ticket.expiry_minutes)),
            TradeStatus::Active,
        );
        self.ledger.lock().create(trade.clone())?;

        info!(
            trade_id = %trade.id(),
            gateway = self.gateway.gateway_name(),
            symbol = %trade.symbol(),
            direction = %trade.direction(),
            stake = %trade.stake(),
            expiry = %trade.expiry(),
            "Trade executed"
        );
        Ok(Some(trade))
    }

    /// Sweep expired trades and settle each against the gateway's
    /// settlement query.
    ///
    /// Trades whose outcome is not yet known stay active for the next
    /// sweep. Risk statistics are fed exactly once per trade; the
    /// ledger's one-shot guard covers overlapping sweeps.
    pub async fn settle_expired(&self) -> Result<Vec<Trade>> {
        self.settle_expired_at(Utc::now()).await
    }

    /// Clock-injected variant of [`Self::settle_expired`].
    pub async fn settle_expired_at(&self, now: DateTime<Utc>) -> Result<Vec<Trade>> {
        let expired = self.ledger.lock().sweep_expired(now);
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        let mut settled = Vec::new();
        for trade in expired {
            let settlement = match self.gateway.poll_settlement(&trade).await {
                Ok(Some(settlement)) => settlement,
                Ok(None) => continue,
                Err(e) => {
                    warn!(trade_id = %trade.id(), error = %e, "Settlement query failed");
                    continue;
                }
            };

            let outcome = self.ledger.lock().settle(
                trade.id(),
                settlement.status,
                settlement.profit,
                settlement.exit_price,
            );
            match outcome {
                Ok(closed) => {
                    self.risk
                        .lock()
                        .update_result_at(settlement.profit, closed.stake(), now);
                    settled.push(closed);
                }
                // Another sweep won the race; stats were already fed.
                Err(LedgerError::AlreadyTerminal(_)) => {}
                Err(e) => {
                    error!(trade_id = %trade.id(), error = %e, "Settlement bookkeeping failed");
                }
            }
        }

        if !settled.is_empty() {
            info!(count = settled.len(), "Expired trades settled");
        }
        Ok(settled)
    }

    /// Cancel an active trade.
    ///
    /// The gateway is asked first; the ledger then records the
    /// cancellation without a result.
    pub async fn cancel(&self, id: &TradeId) -> Result<()> {
        let trade = self
            .ledger
            .lock()
            .get(id)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownTrade(id.to_string()))?;

        self.gateway.cancel_order(&trade).await?;
        self.ledger.lock().cancel(id)?;
        info!(trade_id = %id, "Trade cancelled");
        Ok(())
    }

    #[must_use]
    pub fn active_trades(&self) -> Vec<Trade> {
        self.ledger.lock().active_trades()
    }

    #[must_use]
    pub fn trade_history(&self) -> Vec<Trade> {
        self.ledger.lock().history().to_vec()
    }

    /// Read-only risk snapshot for the monitoring collaborator.
    #[must_use]
    pub fn risk_metrics(&self) -> RiskMetrics {
        self.risk.lock().metrics()
    }

    #[must_use]
    pub fn daily_summary(&self) -> DailySummary {
        self.risk.lock().daily_summary()
    }

    #[must_use]
    pub fn should_stop_trading(&self) -> bool {
        self.risk.lock().should_stop_trading()
    }

    /// Persist the risk state; failures are logged, never fatal.
    pub fn save_risk_state(&self, path: &std::path::Path) {
        if let Err(e) = self.risk.lock().save_state(path) {
            warn!(path = %path.display(), error = %e, "Failed to persist risk state");
        }
    }
}
