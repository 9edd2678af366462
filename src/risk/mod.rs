//! Risk management: pre-trade gating, stake sizing, rolling statistics
//! and state persistence.

mod engine;
mod news;
mod persistence;
mod stats;

pub use engine::{DailySummary, RiskDecision, RiskEngine, RiskLevel, RiskMetrics};
pub use news::NewsFilter;
pub use persistence::RiskState;
pub use stats::{AccountState, DailyRiskStats, LastResult, TradeRecord};
