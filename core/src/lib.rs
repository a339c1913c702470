//! streamchat Core - Headless Streaming Chat Client
//!
//! This crate holds everything a chat surface needs except the surface
//! itself: the message list, the wire protocol, the turn state machine and
//! the two transport paths to the backend.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     View Layer (TUI)                        │
//! │   renders messages()      calls send_text / upload_image    │
//! └──────────────┬───────────────────────────▲─────────────────┘
//!                │                           │ TransportEvent
//! ┌──────────────▼───────────────────────────┴─────────────────┐
//! │                        ChatSession                          │
//! │  ┌──────────────┐  ┌───────────┐  ┌──────────────────────┐  │
//! │  │ MessageStore │  │ TurnState │  │   ConnectionState    │  │
//! │  │  (reduce)    │  │           │  │                      │  │
//! │  └──────────────┘  └───────────┘  └──────────────────────┘  │
//! └──────────────┬───────────────────────────┬─────────────────┘
//!                │                           │
//!     ┌──────────▼─────────┐      ┌──────────▼──────────┐
//!     │  WebSocketChannel  │      │  HttpImageUploader  │
//!     │  (text turns)      │      │  (multipart POST)   │
//!     └────────────────────┘      └─────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use std::time::Duration;
//! use streamchat_core::{load_config, ChatSession, HttpImageUploader, WebSocketChannel};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let channel = WebSocketChannel::new(config.websocket_url(), config.connect_timeout);
//!     let uploader = HttpImageUploader::new(config.upload_url());
//!     let mut session = ChatSession::new(channel, uploader);
//!
//!     let (tx, mut rx) = mpsc::channel(64);
//!     session.connect(tx).await?;
//!     session.send_text("Hi").await?;
//!
//!     while let Some(event) = rx.recv().await {
//!         session.handle_event(event);
//!         // Render session.messages()
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`messages`]: Message records, metrics and feedback
//! - [`store`]: The reducer and the store that owns the message list
//! - [`protocol`]: Inbound and outbound WebSocket frames
//! - [`turn`]: Turn and connection state
//! - [`image`]: Image validation and `data:` URI previews
//! - [`transport`]: WebSocket channel and HTTP image upload
//! - [`session`]: Ties the above together
//! - [`config`]: TOML, environment and CLI configuration
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod image;
pub mod messages;
pub mod protocol;
pub mod session;
pub mod store;
pub mod transport;
pub mod turn;

// Re-exports for convenience
pub use image::{decode_data_uri, guess_media_type, ImageAttachment, ImageError, MAX_IMAGE_BYTES};
pub use messages::{Feedback, Message, MessageId, Metrics, Sender, Sentiment, IMAGE_ONLY_LABEL};
pub use protocol::{FrameError, InboundFrame, OutboundFrame};
pub use session::{ChatSession, SendError, UploadTicket, CONNECTION_LOST_NOTICE};
pub use store::{reduce, MessageAction, MessageStore};
pub use transport::{
    FrameTransport, HttpImageUploader, ImageUploader, TransportError, TransportEvent, UploadError,
    UploadReply, WebSocketChannel,
};
pub use turn::{ConnectionState, TurnEvent, TurnState};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ChatConfig, ChatToml, ConfigError,
    ConfigOverrides, ConfigSource,
};
