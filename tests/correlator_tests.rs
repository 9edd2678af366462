//! Tests for request/response correlation under concurrency.

use std::time::Duration;

use serde_json::json;
use stakeout::broker::RequestCorrelator;
use stakeout::broker::message::InboundMessage;
use stakeout::error::{BrokerError, Error};
use tokio::sync::Barrier;

fn response(req_id: u64) -> InboundMessage {
    InboundMessage::parse(&json!({"msg_type": "proposal", "req_id": req_id}).to_string()).unwrap()
}

/// Two concurrent requests whose responses arrive in reverse order each
/// reach their own waiter exactly once.
#[tokio::test]
async fn reverse_order_responses_route_to_their_own_waiters() {
    let correlator = RequestCorrelator::new();

    let (id_a, reply_a) = correlator.register(&mut json!({"proposal": 1}));
    let (id_b, reply_b) = correlator.register(&mut json!({"proposal": 1}));

    let barrier = std::sync::Arc::new(Barrier::new(3));

    let waiter_a = {
        let barrier = barrier.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            reply_a.wait(Duration::from_secs(2)).await
        })
    };
    let waiter_b = {
        let barrier = barrier.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            reply_b.wait(Duration::from_secs(2)).await
        })
    };

    barrier.wait().await;
    // responses delivered in reverse order
    assert!(correlator.resolve(response(id_b)).is_none());
    assert!(correlator.resolve(response(id_a)).is_none());

    let msg_a = waiter_a.await.unwrap().unwrap();
    let msg_b = waiter_b.await.unwrap().unwrap();
    assert_eq!(msg_a.req_id, Some(id_a));
    assert_eq!(msg_b.req_id, Some(id_b));
    assert_eq!(correlator.pending_count(), 0);
}

/// Reconnecting fails every outstanding request with `ConnectionLost`
/// and restarts the id counter at 1.
#[tokio::test]
async fn reconnect_fails_outstanding_and_resets_ids() {
    let correlator = RequestCorrelator::new();

    let (first_id, reply_a) = correlator.register(&mut json!({"balance": 1}));
    let (_, reply_b) = correlator.register(&mut json!({"balance": 1}));
    assert_eq!(first_id, 1);
    assert_eq!(correlator.pending_count(), 2);

    correlator.reset();

    for reply in [reply_a, reply_b] {
        let err = reply.wait(Duration::from_secs(1)).await.unwrap_err();
        assert!(
            matches!(err, Error::Broker(BrokerError::ConnectionLost { .. })),
            "expected ConnectionLost, got {err}"
        );
    }

    let (id_after_reset, _reply) = correlator.register(&mut json!({"balance": 1}));
    assert_eq!(id_after_reset, 1);
}

/// A response for an evicted request falls through to event dispatch
/// instead of completing anyone.
#[tokio::test]
async fn late_response_after_timeout_is_uncorrelated() {
    let correlator = RequestCorrelator::new();
    let (req_id, reply) = correlator.register(&mut json!({"buy": "p-1"}));

    let err = reply.wait(Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, Error::Broker(BrokerError::Timeout { .. })));

    let handed_back = correlator.resolve(response(req_id));
    assert!(handed_back.is_some());
}
