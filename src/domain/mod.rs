//! Broker-agnostic domain types: signals, trades, and the trade ledger.

mod ledger;
mod signal;
mod trade;

pub use ledger::TradeLedger;
pub use signal::Signal;
pub use trade::{Direction, Trade, TradeId, TradeStatus};
