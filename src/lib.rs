//! Stakeout - risk-gated binary options trading.
//!
//! This crate places CALL/PUT contracts against a broker over one
//! persistent WebSocket connection, with a risk engine gating, sizing
//! and tracking every trade.
//!
//! # Architecture
//!
//! Two subsystems carry the weight:
//!
//! - **`broker`** - the protocol client: a split-stream transport, a
//!   request correlator matching responses to waiters by `req_id`, and
//!   an event dispatcher for unsolicited pushes (ticks).
//! - **`risk`** + **`domain`** - the trade lifecycle engine: pre-trade
//!   checks with full rejection rationale, deterministic stake sizing,
//!   and a ledger whose one-shot transitions make settlement auditable.
//!
//! The [`executor`] module bridges the two: one `OrderGateway` contract
//! with live and paper implementations, and the `TradeEngine` façade
//! exposing propose/settle/cancel.
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files
//! - [`domain`] - Signals, trades, and the trade ledger
//! - [`error`] - Error types for the crate
//! - [`broker`] - WebSocket protocol client
//! - [`risk`] - Risk engine, rolling statistics, persistence
//! - [`executor`] - Order gateways and the execution engine
//! - [`strategy`] - Signal source port and a reference implementation
//! - [`app`] - Application orchestration
//!
//! # Example
//!
//! ```no_run
//! use stakeout::config::Config;
//! use stakeout::app::App;
//!
//! # async fn run() -> stakeout::error::Result<()> {
//! let config = Config::load("config.toml")?;
//! App::run(config).await
//! # }
//! ```

pub mod app;
pub mod broker;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod risk;
pub mod strategy;
