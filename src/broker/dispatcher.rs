//! Routing for unsolicited broker messages.
//!
//! Messages that answer no outstanding request (price ticks, stream
//! pushes) are routed to observers registered per `msg_type`. Observers
//! run in registration order; one failing observer never blocks the rest.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::Error;

use super::message::InboundMessage;

type Observer = Box<dyn Fn(&InboundMessage) -> Result<(), Error> + Send + Sync>;

/// Observer registry keyed by message kind.
#[derive(Default)]
pub struct EventDispatcher {
    observers: RwLock<HashMap<String, Vec<Observer>>>,
}

impl EventDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for one message kind.
    pub fn on<F>(&self, msg_type: impl Into<String>, observer: F)
    where
        F: Fn(&InboundMessage) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.observers
            .write()
            .entry(msg_type.into())
            .or_default()
            .push(Box::new(observer));
    }

    /// Deliver a message to every observer of its kind, once each.
    ///
    /// Observer errors are logged and delivery continues with the next
    /// observer.
    pub fn route(&self, msg: &InboundMessage) {
        let kind = msg.kind().to_string();
        let observers = self.observers.read();
        let Some(list) = observers.get(&kind) else {
            debug!(msg_type = %kind, "No observer for message");
            return;
        };
        for (index, observer) in list.iter().enumerate() {
            if let Err(e) = observer(msg) {
                warn!(msg_type = %kind, index, error = %e, "Observer failed");
            }
        }
    }

    /// Number of observers registered for a kind.
    #[must_use]
    pub fn observer_count(&self, msg_type: &str) -> usize {
        self.observers
            .read()
            .get(msg_type)
            .map_or(0, Vec::len)
    }
}
