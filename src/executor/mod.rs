//! Order execution: the gateway abstraction and the orchestration engine.
//!
//! One [`OrderGateway`] contract, two implementations selected at
//! construction: [`LiveGateway`] places real orders through the broker
//! client, [`PaperGateway`] fills synthetically against a local price
//! feed. The [`TradeEngine`] on top is gateway-agnostic.

mod engine;
mod live;
mod paper;

pub use engine::TradeEngine;
pub use live::LiveGateway;
pub use paper::PaperGateway;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Direction, Trade, TradeStatus};
use crate::error::Result;

/// Order parameters derived from an approved signal.
#[derive(Debug, Clone)]
pub struct OrderTicket {
    pub symbol: String,
    pub direction: Direction,
    pub stake: Decimal,
    pub expiry_minutes: u32,
    /// Market price observed at signal time, used when the gateway has
    /// no fresher quote.
    pub entry_hint: Option<Decimal>,
}

/// Broker confirmation for a placed order.
#[derive(Debug, Clone)]
pub struct OrderConfirmation {
    /// Broker-side contract identifier; becomes the trade id.
    pub contract_id: String,
    /// Reference price at entry.
    pub entry_price: Decimal,
    /// Amount actually committed.
    pub buy_price: Decimal,
    /// Gross payout on a win.
    pub payout: Decimal,
}

/// Final outcome of an expired contract.
#[derive(Debug, Clone)]
pub struct Settlement {
    /// Terminal status: `Won`, `Lost` or `Cancelled`.
    pub status: TradeStatus,
    /// Net result; positive on a win, negative on a loss.
    pub profit: Decimal,
    pub exit_price: Option<Decimal>,
}

/// Gateway for submitting and settling orders.
///
/// Same contract for live and simulated trading; the side effects
/// differ, the engine on top does not.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Quote and buy a contract for the ticket.
    async fn place_order(&self, ticket: &OrderTicket) -> Result<OrderConfirmation>;

    /// Query the settlement state of an expired trade.
    ///
    /// `None` means the contract has not settled yet; the caller retries
    /// on a later sweep. Outcomes are never guessed here.
    async fn poll_settlement(&self, trade: &Trade) -> Result<Option<Settlement>>;

    /// Request broker-side cancellation of an open contract.
    async fn cancel_order(&self, trade: &Trade) -> Result<()>;

    /// Whether the gateway can currently reach its venue.
    fn is_connected(&self) -> bool;

    /// Gateway name for logging.
    fn gateway_name(&self) -> &'static str;
}
