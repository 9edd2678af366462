//! Broker protocol client: transport, correlation, event dispatch.

mod client;
mod correlator;
mod dispatcher;
pub mod message;
mod transport;

pub use client::BrokerClient;
pub use correlator::{PendingReply, RequestCorrelator};
pub use dispatcher::EventDispatcher;
pub use transport::{Transport, TransportEvent};
