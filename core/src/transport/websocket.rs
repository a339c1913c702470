//! WebSocket Streaming Channel
//!
//! Client side of the chat WebSocket. One read task forwards inbound text
//! frames to the session's event channel; one write task drains a queue of
//! outbound messages into the socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::protocol::OutboundFrame;
use crate::transport::traits::{FrameTransport, TransportError, TransportEvent};

/// Outbound queue depth
const WRITE_QUEUE: usize = 32;

/// WebSocket client for the chat backend
pub struct WebSocketChannel {
    url: String,
    connect_timeout: Duration,
    /// Queue feeding the write task
    writer: Option<mpsc::Sender<WsMessage>>,
    connected: Arc<AtomicBool>,
}

impl WebSocketChannel {
    /// Create a channel for `url` (`ws://` or `wss://`)
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            connect_timeout,
            writer: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The endpoint this channel connects to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl FrameTransport for WebSocketChannel {
    async fn connect(
        &mut self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::AlreadyConnected);
        }

        let handshake =
            tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()));
        let (ws_stream, _) = handshake
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout.as_millis() as u64))?
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {e}", self.url)))?;

        let (mut write, mut read) = ws_stream.split();
        let (writer, mut outbound) = mpsc::channel::<WsMessage>(WRITE_QUEUE);

        // Fresh flag per connection so tasks from an earlier one cannot clear it
        self.connected = Arc::new(AtomicBool::new(true));
        let _ = events.send(TransportEvent::Connected).await;

        // Read task: socket -> events
        let connected_read = Arc::clone(&self.connected);
        tokio::spawn(async move {
            let mut reason = None;
            while let Some(incoming) = read.next().await {
                match incoming {
                    Ok(WsMessage::Text(text)) => {
                        if events.send(TransportEvent::Frame(text)).await.is_err() {
                            tracing::debug!("Event receiver dropped");
                            break;
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        reason = frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty());
                        tracing::debug!(reason = ?reason, "Connection closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket read error");
                        reason = Some(e.to_string());
                        break;
                    }
                }
            }

            connected_read.store(false, Ordering::SeqCst);
            let _ = events.send(TransportEvent::Disconnected { reason }).await;
            tracing::info!("Disconnected from chat backend");
        });

        // Write task: queue -> socket
        let connected_write = Arc::clone(&self.connected);
        tokio::spawn(async move {
            while let Some(msg) = outbound.recv().await {
                let closing = matches!(msg, WsMessage::Close(_));
                if let Err(e) = write.send(msg).await {
                    tracing::warn!(error = %e, "WebSocket write error");
                    break;
                }
                if closing {
                    break;
                }
            }

            connected_write.store(false, Ordering::SeqCst);
        });

        self.writer = Some(writer);

        tracing::info!(url = %self.url, "Connected to chat backend");

        Ok(())
    }

    async fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }

        let payload = frame.to_json()?;
        match self.writer {
            Some(ref tx) => tx
                .send(WsMessage::Text(payload))
                .await
                .map_err(|_| TransportError::SendFailed("Channel closed".to_string())),
            None => Err(TransportError::NotConnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(tx) = self.writer.take() {
            // The write task exits after the close frame goes out
            let _ = tx.send(WsMessage::Close(None)).await;
        }
        self.connected.store(false, Ordering::SeqCst);

        tracing::info!(url = %self.url, "Closed chat connection");
        Ok(())
    }
}
