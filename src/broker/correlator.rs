//! Request/response correlation.
//!
//! Every outbound request gets a monotonically increasing `req_id`
//! embedded under the reserved field; the broker echoes it back on the
//! matching response. Pending entries live in a mutex-guarded map keyed
//! by id and are completed exactly once, through a single-fulfillment
//! channel. Ids are per-connection: a reconnect fails every outstanding
//! entry and restarts the counter at 1.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{BrokerError, Result};

use super::message::{InboundMessage, REQ_ID_FIELD};

type Reply = std::result::Result<InboundMessage, BrokerError>;

struct PendingRequest {
    reply: oneshot::Sender<Reply>,
    sent_at: Instant,
}

struct Inner {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

/// Allocates request ids and routes responses back to their waiters.
#[derive(Clone)]
pub struct RequestCorrelator {
    inner: Arc<Inner>,
}

impl RequestCorrelator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Allocate the next id, embed it into `payload`, and store the
    /// pending entry. Returns immediately; the caller forwards the
    /// payload to the transport and may await the [`PendingReply`].
    pub fn register(&self, payload: &mut Value) -> (u64, PendingReply) {
        let req_id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        if let Some(obj) = payload.as_object_mut() {
            obj.insert(REQ_ID_FIELD.into(), Value::from(req_id));
        }

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().insert(
            req_id,
            PendingRequest {
                reply: tx,
                sent_at: Instant::now(),
            },
        );

        (
            req_id,
            PendingReply {
                inner: self.inner.clone(),
                req_id,
                rx,
            },
        )
    }

    /// Route an inbound message to its waiter.
    ///
    /// Consumes the message when it answers a stored request (the waiter
    /// is completed exactly once and the entry removed); hands it back
    /// otherwise so the caller can forward it to the event dispatcher.
    pub fn resolve(&self, msg: InboundMessage) -> Option<InboundMessage> {
        let Some(req_id) = msg.req_id else {
            return Some(msg);
        };
        let Some(entry) = self.inner.pending.lock().remove(&req_id) else {
            // Evicted after timeout, or interest was dropped.
            return Some(msg);
        };
        debug!(
            req_id,
            elapsed_ms = entry.sent_at.elapsed().as_millis() as u64,
            "Response correlated"
        );
        if entry.reply.send(Ok(msg)).is_err() {
            warn!(req_id, "Waiter gone before response arrived");
        }
        None
    }

    /// Fail every outstanding request with `ConnectionLost` and restart
    /// the id counter. Called when the connection drops so no caller
    /// waits forever.
    pub fn reset(&self) {
        let drained: Vec<(u64, PendingRequest)> =
            self.inner.pending.lock().drain().collect();
        if !drained.is_empty() {
            warn!(count = drained.len(), "Failing outstanding requests");
        }
        for (req_id, entry) in drained {
            let _ = entry.reply.send(Err(BrokerError::ConnectionLost { req_id }));
        }
        self.inner.next_id.store(1, Ordering::SeqCst);
    }

    /// Number of requests currently awaiting a response.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }
}

impl Default for RequestCorrelator {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-fulfillment handle to one outstanding request.
///
/// Dropping the handle discards interest: the pending entry is removed
/// and a late response falls through to the event dispatcher.
pub struct PendingReply {
    inner: Arc<Inner>,
    req_id: u64,
    rx: oneshot::Receiver<Reply>,
}

impl PendingReply {
    #[must_use]
    pub fn req_id(&self) -> u64 {
        self.req_id
    }

    /// Wait for the response with a bounded deadline.
    ///
    /// # Errors
    ///
    /// `Timeout` when no response arrives in time (the entry is evicted),
    /// `ConnectionLost` when the connection dropped while waiting, or the
    /// broker's own `Api` error.
    pub async fn wait(mut self, timeout: Duration) -> Result<InboundMessage> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(reply)) => {
                let msg = reply?;
                if let Some(api_err) = msg.api_error() {
                    return Err(api_err.into());
                }
                Ok(msg)
            }
            Ok(Err(_)) => Err(BrokerError::ConnectionLost {
                req_id: self.req_id,
            }
            .into()),
            Err(_) => {
                warn!(req_id = self.req_id, "Request timed out, evicting");
                Err(BrokerError::Timeout {
                    req_id: self.req_id,
                    timeout_secs: timeout.as_secs(),
                }
                .into())
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        // No-op when the entry was already resolved or drained.
        self.inner.pending.lock().remove(&self.req_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn correlated(req_id: u64, kind: &str) -> InboundMessage {
        InboundMessage::parse(
            &json!({"msg_type": kind, "req_id": req_id}).to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn ids_start_at_one_and_increase() {
        let correlator = RequestCorrelator::new();
        let mut a = json!({"balance": 1});
        let mut b = json!({"balance": 1});
        let (id_a, _ra) = correlator.register(&mut a);
        let (id_b, _rb) = correlator.register(&mut b);
        assert_eq!(id_a, 1);
        assert_eq!(id_b, 2);
        assert_eq!(a[REQ_ID_FIELD], json!(1));
        assert_eq!(b[REQ_ID_FIELD], json!(2));
    }

    #[tokio::test]
    async fn out_of_order_responses_reach_their_own_waiters() {
        let correlator = RequestCorrelator::new();
        let (id_a, reply_a) = correlator.register(&mut json!({"proposal": 1}));
        let (id_b, reply_b) = correlator.register(&mut json!({"proposal": 1}));

        // deliver in reverse order
        assert!(correlator.resolve(correlated(id_b, "proposal")).is_none());
        assert!(correlator.resolve(correlated(id_a, "proposal")).is_none());

        let msg_a = reply_a.wait(Duration::from_secs(1)).await.unwrap();
        let msg_b = reply_b.wait(Duration::from_secs(1)).await.unwrap();
        assert_eq!(msg_a.req_id, Some(id_a));
        assert_eq!(msg_b.req_id, Some(id_b));
    }

    #[tokio::test]
    async fn uncorrelated_messages_are_handed_back() {
        let correlator = RequestCorrelator::new();
        let tick = InboundMessage::parse(r#"{"msg_type":"tick"}"#).unwrap();
        assert!(correlator.resolve(tick).is_some());

        // unknown req_id: evicted or never registered
        assert!(correlator.resolve(correlated(99, "buy")).is_some());
    }

    #[tokio::test]
    async fn reset_fails_pending_and_restarts_counter() {
        let correlator = RequestCorrelator::new();
        let (_, reply) = correlator.register(&mut json!({"balance": 1}));
        correlator.reset();

        let err = reply.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Broker(BrokerError::ConnectionLost { .. })
        ));

        let (id, _r) = correlator.register(&mut json!({"balance": 1}));
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn timeout_evicts_the_entry() {
        let correlator = RequestCorrelator::new();
        let (req_id, reply) = correlator.register(&mut json!({"balance": 1}));
        assert_eq!(correlator.pending_count(), 1);

        let err = reply.wait(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Broker(BrokerError::Timeout { .. })
        ));
        assert_eq!(correlator.pending_count(), 0);

        // a late response now falls through
        assert!(correlator.resolve(correlated(req_id, "balance")).is_some());
    }

    #[tokio::test]
    async fn dropping_the_reply_discards_interest() {
        let correlator = RequestCorrelator::new();
        let (req_id, reply) = correlator.register(&mut json!({"proposal": 1}));
        drop(reply);
        assert_eq!(correlator.pending_count(), 0);
        assert!(correlator.resolve(correlated(req_id, "proposal")).is_some());
    }

    #[tokio::test]
    async fn api_errors_propagate_to_the_waiter() {
        let correlator = RequestCorrelator::new();
        let (req_id, reply) = correlator.register(&mut json!({"buy": "abc"}));
        let msg = InboundMessage::parse(
            &json!({
                "msg_type": "buy",
                "req_id": req_id,
                "error": {"code": "InvalidContract", "message": "gone"}
            })
            .to_string(),
        )
        .unwrap();
        assert!(correlator.resolve(msg).is_none());

        let err = reply.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Broker(BrokerError::Api { .. })
        ));
    }
}
