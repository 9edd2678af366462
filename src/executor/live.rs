//! Live order gateway backed by the broker client.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::broker::BrokerClient;
use crate::domain::{Trade, TradeStatus};
use crate::error::Result;

use super::{OrderConfirmation, OrderGateway, OrderTicket, Settlement};

/// Places real orders: proposal round-trip, then buy at the quoted price.
pub struct LiveGateway {
    client: Arc<BrokerClient>,
}

impl LiveGateway {
    #[must_use]
    pub fn new(client: Arc<BrokerClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OrderGateway for LiveGateway {
    async fn place_order(&self, ticket: &OrderTicket) -> Result<OrderConfirmation> {
        let proposal = self
            .client
            .proposal(
                ticket.direction,
                &ticket.symbol,
                ticket.stake,
                ticket.expiry_minutes,
            )
            .await?;

        info!(
            symbol = %ticket.symbol,
            direction = %ticket.direction,
            ask_price = %proposal.ask_price,
            payout = %proposal.payout,
            "Proposal quoted, buying"
        );

        let buy = self.client.buy(&proposal.id, proposal.ask_price).await?;

        Ok(OrderConfirmation {
            contract_id: buy.contract_id,
            entry_price: proposal.spot,
            buy_price: buy.buy_price,
            payout: proposal.payout,
        })
    }

    async fn poll_settlement(&self, trade: &Trade) -> Result<Option<Settlement>> {
        let reply = self.client.contract_status(trade.id().as_str()).await?;

        let settlement = match reply.status.as_str() {
            "open" => None,
            "won" => Some(Settlement {
                status: TradeStatus::Won,
                profit: reply.profit.unwrap_or(Decimal::ZERO),
                exit_price: reply.exit_spot,
            }),
            "lost" => Some(Settlement {
                status: TradeStatus::Lost,
                profit: reply.profit.unwrap_or(-trade.stake()),
                exit_price: reply.exit_spot,
            }),
            "cancelled" => Some(Settlement {
                status: TradeStatus::Cancelled,
                profit: Decimal::ZERO,
                exit_price: reply.exit_spot,
            }),
            other => {
                warn!(contract_id = %reply.contract_id, status = %other, "Unknown contract status");
                None
            }
        };
        Ok(settlement)
    }

    async fn cancel_order(&self, trade: &Trade) -> Result<()> {
        // The wire protocol has no cancel message for bought contracts;
        // dropping interest does not close the broker-side position.
        warn!(
            trade_id = %trade.id(),
            "Broker-side cancellation unsupported; contract stays open at the venue"
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    fn gateway_name(&self) -> &'static str {
        "live"
    }
}
