//! Simulated order gateway for paper trading and tests.
//!
//! Fills immediately at the local price feed, settles deterministically
//! by comparing the exit quote against the entry: a CALL wins above its
//! entry price, a PUT below. No randomness, so test runs reproduce.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use crate::domain::{Direction, Trade, TradeStatus};
use crate::error::{ExecutionError, Result};

use super::{OrderConfirmation, OrderGateway, OrderTicket, Settlement};

/// Synthetic fill gateway.
pub struct PaperGateway {
    connected: AtomicBool,
    /// Payout ratio on a winning stake (0.8 = 80% return).
    payout_ratio: Decimal,
    prices: DashMap<String, Decimal>,
}

impl PaperGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            payout_ratio: dec!(0.8),
            prices: DashMap::new(),
        }
    }

    /// Update the simulated market price for a symbol.
    pub fn set_price(&self, symbol: impl Into<String>, price: Decimal) {
        self.prices.insert(symbol.into(), price);
    }

    /// Simulate a connection drop or recovery.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn price_for(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).map(|entry| *entry.value())
    }
}

impl Default for PaperGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn place_order(&self, ticket: &OrderTicket) -> Result<OrderConfirmation> {
        let entry_price = self
            .price_for(&ticket.symbol)
            .or(ticket.entry_hint)
            .ok_or_else(|| ExecutionError::NoMarketPrice {
                symbol: ticket.symbol.clone(),
            })?;

        let contract_id = format!("paper-{}", Uuid::new_v4());
        info!(
            contract_id = %contract_id,
            symbol = %ticket.symbol,
            direction = %ticket.direction,
            stake = %ticket.stake,
            entry_price = %entry_price,
            "Paper order filled"
        );

        Ok(OrderConfirmation {
            contract_id,
            entry_price,
            buy_price: ticket.stake,
            payout: (ticket.stake * (Decimal::ONE + self.payout_ratio)).round_dp(2),
        })
    }

    async fn poll_settlement(&self, trade: &Trade) -> Result<Option<Settlement>> {
        // Without a current quote the contract cannot settle yet; the
        // next sweep retries.
        let Some(exit_price) = self.price_for(trade.symbol()) else {
            return Ok(None);
        };

        let won = match trade.direction() {
            Direction::Call => exit_price > trade.entry_price(),
            Direction::Put => exit_price < trade.entry_price(),
        };

        let settlement = if won {
            Settlement {
                status: TradeStatus::Won,
                profit: (trade.stake() * self.payout_ratio).round_dp(2),
                exit_price: Some(exit_price),
            }
        } else {
            Settlement {
                status: TradeStatus::Lost,
                profit: -trade.stake(),
                exit_price: Some(exit_price),
            }
        };
        Ok(Some(settlement))
    }

    async fn cancel_order(&self, trade: &Trade) -> Result<()> {
        info!(trade_id = %trade.id(), "Paper order cancelled");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn gateway_name(&self) -> &'static str {
        "paper"
    }
}
