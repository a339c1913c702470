//! Transport Layer
//!
//! The two paths to the chat backend:
//! - `WebSocketChannel`: long-lived streaming channel for text turns
//! - `HttpImageUploader`: one-shot multipart upload for images
//!
//! Neither touches the message list. The streaming channel posts
//! [`TransportEvent`]s and the uploader returns an [`UploadReply`]; the
//! session turns both into store actions.

pub mod traits;
pub mod upload;
pub mod websocket;

pub use traits::{FrameTransport, TransportError, TransportEvent};
pub use upload::{HttpImageUploader, ImageUploader, UploadError, UploadReply};
pub use websocket::WebSocketChannel;
