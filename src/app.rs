//! App orchestration module.
//!
//! Wires the broker client, the gateway (live or paper), the risk
//! engine and the strategy into the trading loop: poll signals on the
//! check interval, sweep expired trades on the settlement interval,
//! reconnect with backoff when the connection drops.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::broker::message::TickEvent;
use crate::broker::BrokerClient;
use crate::config::{Config, ReconnectionConfig};
use crate::error::Result;
use crate::executor::{LiveGateway, OrderGateway, PaperGateway, TradeEngine};
use crate::risk::RiskEngine;
use crate::strategy::{MarketSnapshot, Strategy, TickMomentum};

/// Ticks retained per symbol for strategy evaluation.
const TICK_HISTORY: usize = 100;

type TickBuffers = Arc<Mutex<HashMap<String, VecDeque<Decimal>>>>;

/// Main application struct.
pub struct App;

impl App {
    /// Run the trading loop until risk stops it or the task is aborted.
    pub async fn run(config: Config) -> Result<()> {
        if config.trading.assets.is_empty() {
            warn!("No assets configured, nothing to trade");
            return Ok(());
        }

        let mut risk = RiskEngine::new(config.risk.clone());
        risk.load_state(&config.risk.state_file);

        // Market data flows through the broker client in both modes;
        // paper mode only swaps the execution side.
        let client = Arc::new(BrokerClient::new(config.broker.clone()));
        client.connect().await?;
        subscribe_assets(&client, &config.trading.assets);

        if config.broker.api_token.is_some() {
            match client.balance().await {
                Ok(reply) => {
                    info!(balance = %reply.balance, currency = %reply.currency, "Account balance");
                }
                Err(e) => warn!(error = %e, "Balance query failed"),
            }
        }

        let buffers: TickBuffers = Arc::new(Mutex::new(HashMap::new()));
        let sink = buffers.clone();
        client.dispatcher().on("tick", move |msg| {
            let tick: TickEvent = msg.payload("tick")?;
            let mut buffers = sink.lock();
            let buffer = buffers.entry(tick.symbol).or_default();
            if buffer.len() == TICK_HISTORY {
                buffer.pop_front();
            }
            buffer.push_back(tick.quote);
            Ok(())
        });

        let gateway: Arc<dyn OrderGateway> = if config.trading.paper {
            let paper = Arc::new(PaperGateway::new());
            let feed = paper.clone();
            client.dispatcher().on("tick", move |msg| {
                let tick: TickEvent = msg.payload("tick")?;
                feed.set_price(tick.symbol, tick.quote);
                Ok(())
            });
            info!("Paper gateway selected, orders are simulated");
            paper
        } else {
            info!("Live gateway selected, orders are REAL");
            Arc::new(LiveGateway::new(client.clone()))
        };

        let engine = Arc::new(TradeEngine::new(gateway, risk));

        spawn_settlement_sweep(engine.clone(), &config);

        let mut strategy = TickMomentum::new(20, 0.6, config.trading.default_expiry_minutes);
        info!(strategy = strategy.name(), assets = ?config.trading.assets, "Trading loop started");

        let mut check = tokio::time::interval(Duration::from_secs(config.trading.check_interval_secs));
        loop {
            check.tick().await;

            if !client.is_connected() {
                // No new proposals while we are down; open trades stay
                // in the ledger for settlement after reconnecting.
                engine.disable_trading();
                reconnect_with_backoff(&client, &config.reconnection).await;
                subscribe_assets(&client, &config.trading.assets);
                engine.enable_trading();
            }

            for asset in &config.trading.assets {
                let snapshot = snapshot_for(&buffers, asset);
                let Some(signal) = strategy.generate_signal(&snapshot, asset) else {
                    debug!(asset = %asset, "No signal");
                    continue;
                };

                info!(
                    asset = %asset,
                    direction = %signal.direction,
                    confidence = signal.confidence,
                    "Signal generated"
                );
                match engine.propose_and_execute(&signal).await {
                    Ok(Some(trade)) => {
                        debug!(trade_id = %trade.id(), "Trade open");
                    }
                    Ok(None) => {} // rejection reasons already logged
                    Err(e) => {
                        warn!(asset = %asset, error = %e, "Trade execution failed");
                    }
                }
            }

            let summary = engine.daily_summary();
            debug!(
                trades = summary.total_trades,
                net = %summary.net_result,
                balance = %summary.current_balance,
                "Daily summary"
            );

            if engine.should_stop_trading() {
                warn!(metrics = ?engine.risk_metrics(), "Risk stop conditions reached, halting");
                engine.disable_trading();
                break;
            }
        }

        engine.save_risk_state(&config.risk.state_file);
        Ok(())
    }
}

fn subscribe_assets(client: &BrokerClient, assets: &[String]) {
    for asset in assets {
        if let Err(e) = client.subscribe_ticks(asset) {
            warn!(asset = %asset, error = %e, "Tick subscription failed");
        }
    }
}

fn snapshot_for(buffers: &TickBuffers, asset: &str) -> MarketSnapshot {
    buffers
        .lock()
        .get(asset)
        .map(|ticks| MarketSnapshot {
            ticks: ticks.iter().copied().collect(),
        })
        .unwrap_or_default()
}

fn spawn_settlement_sweep(engine: Arc<TradeEngine>, config: &Config) {
    let interval_secs = config.trading.sweep_interval_secs;
    let state_file = config.risk.state_file.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            match engine.settle_expired().await {
                Ok(settled) if !settled.is_empty() => {
                    engine.save_risk_state(&state_file);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Settlement sweep failed"),
            }
        }
    });
}

/// Retry the connection with capped exponential backoff and jitter.
async fn reconnect_with_backoff(client: &BrokerClient, config: &ReconnectionConfig) {
    let mut delay_ms = config.initial_delay_ms;
    let mut attempt = 1u32;
    loop {
        let jitter = rand::thread_rng().gen_range(0..=delay_ms / 4);
        tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;

        info!(attempt, "Reconnecting to broker");
        match client.connect().await {
            Ok(()) => {
                info!(attempt, "Reconnected");
                return;
            }
            Err(e) => {
                warn!(attempt, error = %e, "Reconnect failed");
                delay_ms = ((delay_ms as f64 * config.backoff_multiplier) as u64)
                    .min(config.max_delay_ms);
                attempt += 1;
            }
        }
    }
}
