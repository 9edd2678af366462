//! Broker client façade.
//!
//! Combines the transport, the request correlator and the event
//! dispatcher into one connection-scoped client with typed request
//! helpers. Inbound routing runs on its own task: correlated responses
//! complete their waiters, everything else goes through the dispatcher.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::BrokerConfig;
use crate::domain::Direction;
use crate::error::{BrokerError, Result};

use super::correlator::{PendingReply, RequestCorrelator};
use super::dispatcher::EventDispatcher;
use super::message::{
    AuthorizeRequest, BalanceReply, BalanceRequest, BuyReply, BuyRequest, ContractStatusReply,
    ContractStatusRequest, ProposalReply, ProposalRequest, TicksRequest,
};
use super::transport::{Transport, TransportEvent};

/// Connection-scoped client for the broker API.
pub struct BrokerClient {
    config: BrokerConfig,
    correlator: RequestCorrelator,
    dispatcher: Arc<EventDispatcher>,
    transport: Mutex<Option<Transport>>,
}

impl BrokerClient {
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            correlator: RequestCorrelator::new(),
            dispatcher: Arc::new(EventDispatcher::new()),
            transport: Mutex::new(None),
        }
    }

    /// Open the connection and start inbound routing.
    ///
    /// Blocks until the socket is up (bounded by the configured connect
    /// timeout) and, when a token is configured, until the authorization
    /// round-trip completes.
    pub async fn connect(&self) -> Result<()> {
        // Per-connection ids: restart the counter and fail anything left
        // over from a previous connection.
        self.correlator.reset();

        let timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let (transport, mut events) = Transport::connect(&self.config.endpoint(), timeout).await?;
        *self.transport.lock() = Some(transport);

        let correlator = self.correlator.clone();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::Message(msg) => {
                        if let Some(uncorrelated) = correlator.resolve(msg) {
                            dispatcher.route(&uncorrelated);
                        }
                    }
                    TransportEvent::Closed { reason } => {
                        warn!(reason = %reason, "Broker connection closed");
                        correlator.reset();
                        break;
                    }
                }
            }
        });

        if let Some(token) = self.config.api_token.clone() {
            self.authorize(&token).await?;
            info!("Broker session authorized");
        }

        Ok(())
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport
            .lock()
            .as_ref()
            .is_some_and(Transport::is_connected)
    }

    /// Registry for unsolicited message observers.
    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Correlate and send a request, returning the reply handle
    /// immediately without waiting for the response.
    pub fn send_request<T: Serialize>(&self, request: &T) -> Result<PendingReply> {
        let mut payload = serde_json::to_value(request)?;
        let (_req_id, reply) = self.correlator.register(&mut payload);
        let transport = self.transport.lock();
        let Some(transport) = transport.as_ref() else {
            return Err(BrokerError::NotConnected.into());
        };
        transport.send(&payload)?;
        Ok(reply)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    async fn authorize(&self, token: &str) -> Result<()> {
        let request = AuthorizeRequest {
            authorize: token.into(),
        };
        self.send_request(&request)?
            .wait(self.request_timeout())
            .await
            .map_err(|e| BrokerError::AuthFailed(e.to_string()))?;
        Ok(())
    }

    /// Query the account balance.
    pub async fn balance(&self) -> Result<BalanceReply> {
        let msg = self
            .send_request(&BalanceRequest::new())?
            .wait(self.request_timeout())
            .await?;
        Ok(msg.payload("balance")?)
    }

    /// Subscribe to the tick stream for a symbol.
    ///
    /// Fire-and-forget: tick pushes reach the registered dispatcher
    /// observers, not a correlated waiter.
    pub fn subscribe_ticks(&self, symbol: &str) -> Result<()> {
        let reply = self.send_request(&TicksRequest::new(symbol))?;
        info!(symbol = %symbol, req_id = reply.req_id(), "Subscribed to ticks");
        Ok(())
    }

    /// Request quoted terms for a contract.
    pub async fn proposal(
        &self,
        direction: Direction,
        symbol: &str,
        amount: Decimal,
        duration_minutes: u32,
    ) -> Result<ProposalReply> {
        let request = ProposalRequest::new(
            direction,
            symbol,
            amount,
            self.config.currency.clone(),
            duration_minutes,
        );
        let msg = self
            .send_request(&request)?
            .wait(self.request_timeout())
            .await?;
        Ok(msg.payload("proposal")?)
    }

    /// Buy a previously quoted proposal.
    pub async fn buy(&self, proposal_id: &str, price: Decimal) -> Result<BuyReply> {
        let request = BuyRequest {
            buy: proposal_id.into(),
            price,
        };
        let msg = self
            .send_request(&request)?
            .wait(self.request_timeout())
            .await?;
        Ok(msg.payload("buy")?)
    }

    /// Query the settlement state of an open contract.
    pub async fn contract_status(&self, contract_id: &str) -> Result<ContractStatusReply> {
        let request = ContractStatusRequest {
            contract_status: contract_id.into(),
        };
        let msg = self
            .send_request(&request)?
            .wait(self.request_timeout())
            .await?;
        Ok(msg.payload("contract_status")?)
    }
}
