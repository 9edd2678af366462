//! WebSocket transport to the broker.
//!
//! Owns one persistent connection: a writer task drains outbound frames,
//! a reader task parses inbound frames and forwards them as
//! [`TransportEvent`]s on a dedicated delivery context. Reconnection is
//! not handled here; when the connection drops, the owner receives a
//! single `Closed` event and decides what to do.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};

use crate::error::{BrokerError, Result};

use super::message::InboundMessage;

/// Event emitted by the reader task.
#[derive(Debug)]
pub enum TransportEvent {
    /// A parsed inbound message.
    Message(InboundMessage),
    /// The connection is gone. Emitted at most once.
    Closed { reason: String },
}

/// Handle to one live broker connection.
#[derive(Clone)]
pub struct Transport {
    outbound: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
}

impl Transport {
    /// Open the connection, blocking the caller until the socket is up or
    /// the timeout elapses.
    ///
    /// Returns the transport handle and the inbound event receiver.
    ///
    /// # Errors
    ///
    /// `ConnectionFailed` when the handshake errors or does not complete
    /// within `timeout`.
    pub async fn connect(
        url: &str,
        timeout: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>)> {
        info!(url = %url, "Connecting to broker");

        let connect = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| {
                BrokerError::ConnectionFailed(format!(
                    "handshake timed out after {}s",
                    timeout.as_secs()
                ))
            })?;
        let (ws, response) = connect.map_err(|e| BrokerError::ConnectionFailed(e.to_string()))?;

        info!(status = %response.status(), "Broker connection open");

        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));

        // Writer task: drains outbound frames onto the sink.
        let writer_flag = connected.clone();
        let writer_events = event_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = sink.send(frame).await {
                    error!(error = %e, "WebSocket write failed");
                    close_once(&writer_flag, &writer_events, e.to_string());
                    break;
                }
            }
        });

        // Reader task: the dedicated delivery context for inbound messages.
        let reader_flag = connected.clone();
        let pong_tx = out_tx.clone();
        tokio::spawn(async move {
            let mut reason = String::from("stream ended");
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        trace!(bytes = text.len(), "Received WebSocket text frame");
                        match InboundMessage::parse(&text) {
                            Ok(msg) => {
                                if event_tx.send(TransportEvent::Message(msg)).is_err() {
                                    reason = "receiver dropped".into();
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, bytes = text.len(), "Failed to parse message");
                            }
                        }
                    }
                    Ok(Message::Ping(data)) => {
                        trace!("Received WebSocket ping");
                        let _ = pong_tx.send(Message::Pong(data));
                    }
                    Ok(Message::Close(frame)) => {
                        info!(frame = ?frame, "WebSocket closed by server");
                        reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".into());
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "WebSocket error");
                        reason = e.to_string();
                        break;
                    }
                }
            }
            close_once(&reader_flag, &event_tx, reason);
        });

        Ok((
            Self {
                outbound: out_tx,
                connected,
            },
            event_rx,
        ))
    }

    /// Queue an outbound JSON payload.
    ///
    /// # Errors
    ///
    /// `NotConnected` when the connection is down.
    pub fn send(&self, payload: &Value) -> Result<()> {
        if !self.is_connected() {
            return Err(BrokerError::NotConnected.into());
        }
        let text = serde_json::to_string(payload)?;
        debug!(bytes = text.len(), "Sending request frame");
        self.outbound
            .send(Message::Text(text))
            .map_err(|_| BrokerError::NotConnected)?;
        Ok(())
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Flip the connected flag and emit the `Closed` event, exactly once even
/// when reader and writer fail around the same time.
fn close_once(
    flag: &AtomicBool,
    events: &mpsc::UnboundedSender<TransportEvent>,
    reason: String,
) {
    if flag.swap(false, Ordering::SeqCst) {
        debug!(reason = %reason, "Transport closed");
        let _ = events.send(TransportEvent::Closed { reason });
    }
}
