//! Transport Traits
//!
//! The streaming channel seen from the session: connect once, push outbound
//! frames, and receive everything inbound as [`TransportEvent`]s on a
//! channel owned by the caller.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::protocol::OutboundFrame;

/// Something the streaming channel observed
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed
    Connected,
    /// A text frame arrived
    Frame(String),
    /// The connection ended; sent once per connection
    Disconnected {
        /// Close reason or error text, when known
        reason: Option<String>,
    },
}

/// Errors from streaming channel operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// The handshake failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The handshake did not finish in time
    #[error("Connection timed out after {0} ms")]
    Timeout(u64),

    /// No open connection
    #[error("Not connected")]
    NotConnected,

    /// A connection is already open
    #[error("Already connected")]
    AlreadyConnected,

    /// The writer task is gone
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The frame could not be serialized
    #[error("Serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Client side of the streaming channel
#[async_trait]
pub trait FrameTransport: Send {
    /// Open the connection
    ///
    /// Inbound traffic is posted to `events` until the connection ends,
    /// finishing with exactly one [`TransportEvent::Disconnected`].
    async fn connect(&mut self, events: mpsc::Sender<TransportEvent>) -> Result<(), TransportError>;

    /// Queue a frame for sending
    async fn send(&self, frame: &OutboundFrame) -> Result<(), TransportError>;

    /// Check if currently connected
    fn is_connected(&self) -> bool;

    /// Close the connection gracefully
    async fn close(&mut self) -> Result<(), TransportError>;
}
