//! Broker WebSocket message types.
//!
//! Outbound requests are flat JSON objects; the correlator injects the
//! reserved `req_id` field before the frame leaves the process. Inbound
//! messages carry a `msg_type` discriminator and echo `req_id` when they
//! answer a correlated request.
//!
//! Example proposal exchange:
//! ```json
//! {"proposal":1,"amount":"10.00","basis":"stake","contract_type":"CALL",
//!  "currency":"USD","duration":5,"duration_unit":"m","symbol":"R_100","req_id":7}
//! {"msg_type":"proposal","req_id":7,"proposal":{"id":"abc","ask_price":"10.00",
//!  "spot":"1234.56","payout":"18.00"}}
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Direction;
use crate::error::BrokerError;

/// Field the correlator reserves for request/response matching.
pub const REQ_ID_FIELD: &str = "req_id";

/// Authorization request, sent first on authenticated connections.
#[derive(Debug, Serialize)]
pub struct AuthorizeRequest {
    pub authorize: String,
}

/// Account balance query.
#[derive(Debug, Serialize)]
pub struct BalanceRequest {
    pub balance: u8,
}

impl BalanceRequest {
    #[must_use]
    pub fn new() -> Self {
        Self { balance: 1 }
    }
}

impl Default for BalanceRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// Tick stream subscription for one symbol.
#[derive(Debug, Serialize)]
pub struct TicksRequest {
    pub ticks: String,
    pub subscribe: u8,
}

impl TicksRequest {
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            ticks: symbol.into(),
            subscribe: 1,
        }
    }
}

/// Contract price quote request, obtained before committing to buy.
#[derive(Debug, Serialize)]
pub struct ProposalRequest {
    pub proposal: u8,
    pub amount: Decimal,
    pub basis: String,
    pub contract_type: String,
    pub currency: String,
    pub duration: u32,
    pub duration_unit: String,
    pub symbol: String,
}

impl ProposalRequest {
    #[must_use]
    pub fn new(
        direction: Direction,
        symbol: impl Into<String>,
        amount: Decimal,
        currency: impl Into<String>,
        duration_minutes: u32,
    ) -> Self {
        Self {
            proposal: 1,
            amount,
            basis: "stake".into(),
            contract_type: direction.contract_type().into(),
            currency: currency.into(),
            duration: duration_minutes,
            duration_unit: "m".into(),
            symbol: symbol.into(),
        }
    }
}

/// Purchase of a previously quoted proposal.
#[derive(Debug, Serialize)]
pub struct BuyRequest {
    pub buy: String,
    pub price: Decimal,
}

/// Settlement status query for an open contract.
#[derive(Debug, Serialize)]
pub struct ContractStatusRequest {
    pub contract_status: String,
}

/// Inbound message envelope.
///
/// Everything the broker pushes down the socket parses into this; the
/// payload stays a raw [`Value`] until a typed view is extracted.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Message kind discriminator (`tick`, `proposal`, `buy`, ...).
    pub msg_type: Option<String>,
    /// Correlation id echoed back for request responses.
    pub req_id: Option<u64>,
    /// Error payload, present when the broker rejected the request.
    pub error: Option<ApiErrorPayload>,
    /// The full raw message.
    #[serde(skip)]
    pub raw: Value,
}

impl InboundMessage {
    /// Parse a raw text frame into an envelope, keeping the raw value.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(text)?;
        let mut msg: InboundMessage = serde_json::from_value(raw.clone())?;
        msg.raw = raw;
        Ok(msg)
    }

    /// Message kind, defaulting to an empty string for untyped pushes.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.msg_type.as_deref().unwrap_or("")
    }

    /// Convert a broker error payload into the crate error, if present.
    #[must_use]
    pub fn api_error(&self) -> Option<BrokerError> {
        self.error.as_ref().map(|e| BrokerError::Api {
            code: e.code.clone(),
            message: e.message.clone(),
        })
    }

    /// Extract the typed payload stored under `field`.
    pub fn payload<T: serde::de::DeserializeOwned>(
        &self,
        field: &str,
    ) -> Result<T, serde_json::Error> {
        let value = self.raw.get(field).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
    }
}

/// Error payload attached to rejected requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorPayload {
    pub code: String,
    pub message: String,
}

/// A price tick pushed for a subscribed symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct TickEvent {
    pub symbol: String,
    pub quote: Decimal,
    pub epoch: i64,
}

/// Quoted terms answering a proposal request.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalReply {
    pub id: String,
    pub ask_price: Decimal,
    pub spot: Decimal,
    pub payout: Decimal,
}

/// Confirmation answering a buy request.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyReply {
    pub contract_id: String,
    pub buy_price: Decimal,
    pub start_time: Option<i64>,
}

/// Balance answering a balance query.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceReply {
    pub balance: Decimal,
    pub currency: String,
}

/// Settlement state answering a contract status query.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractStatusReply {
    pub contract_id: String,
    /// `open`, `won`, `lost` or `cancelled`.
    pub status: String,
    pub profit: Option<Decimal>,
    pub exit_spot: Option<Decimal>,
}
