//! Chat Session
//!
//! The single writer of the [`MessageStore`]. Transport tasks never touch
//! the store; they post [`TransportEvent`]s that the owner of the session
//! feeds to [`ChatSession::handle_event`] in arrival order.
//!
//! # Turn gaps
//!
//! Neither an error frame nor a dropped connection removes the user's
//! message. A reply that was streaming at that moment keeps the text it
//! had and gets no metrics. A connection lost mid-turn also leaves an
//! inline notice so the conversation shows why the reply stopped.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::image::{ImageAttachment, ImageError, MAX_IMAGE_BYTES};
use crate::messages::{Feedback, Message, MessageId};
use crate::protocol::{InboundFrame, OutboundFrame};
use crate::store::{MessageAction, MessageStore};
use crate::transport::{
    FrameTransport, ImageUploader, TransportError, TransportEvent, UploadError, UploadReply,
};
use crate::turn::{ConnectionState, TurnEvent, TurnState};

/// Notice appended when the connection drops mid-turn
pub const CONNECTION_LOST_NOTICE: &str = "Error: connection lost before the reply completed";

/// Why a send or upload was not started
#[derive(Debug, Error)]
pub enum SendError {
    /// Nothing to send after trimming
    #[error("Message is empty")]
    Empty,

    /// The streaming channel is not open
    #[error("Not connected")]
    NotConnected,

    /// A reply is still pending
    #[error("Waiting for the current reply")]
    TurnPending,

    /// An image upload is in flight
    #[error("An image upload is in progress")]
    Uploading,

    /// The image failed local checks
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The streaming channel refused the frame
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The upload request failed
    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// A validated upload waiting for its request to finish
///
/// Produced by [`ChatSession::begin_upload`] and handed back to
/// [`ChatSession::finish_upload`] with the request's result.
#[derive(Clone, Debug)]
pub struct UploadTicket {
    image: ImageAttachment,
    message: String,
}

impl UploadTicket {
    /// The image to upload
    pub fn image(&self) -> &ImageAttachment {
        &self.image
    }

    /// The trimmed text sent with the image
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One conversation with the chat backend
pub struct ChatSession<T, U> {
    transport: T,
    uploader: U,
    store: MessageStore,
    turn: TurnState,
    connection: ConnectionState,
    uploading: bool,
    max_image_bytes: usize,
}

impl<T: FrameTransport, U: ImageUploader> ChatSession<T, U> {
    /// Create a disconnected session
    pub fn new(transport: T, uploader: U) -> Self {
        Self {
            transport,
            uploader,
            store: MessageStore::new(),
            turn: TurnState::Idle,
            connection: ConnectionState::Disconnected,
            uploading: false,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }

    /// Override the image size ceiling
    #[must_use]
    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Open the streaming channel
    ///
    /// Inbound traffic is posted to `events`; feed it back through
    /// [`handle_event`](Self::handle_event).
    pub async fn connect(
        &mut self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<(), TransportError> {
        self.connection = ConnectionState::Connecting;
        match self.transport.connect(events).await {
            Ok(()) => {
                self.connection = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to connect");
                self.connection = ConnectionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Apply one event from the streaming channel
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                self.connection = ConnectionState::Connected;
            }
            TransportEvent::Frame(text) => match InboundFrame::parse(&text) {
                Ok(frame) => self.handle_frame(frame),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping inbound frame");
                }
            },
            TransportEvent::Disconnected { reason } => {
                tracing::info!(
                    reason = ?reason,
                    pending = self.turn.is_pending(),
                    "Connection lost"
                );
                self.connection = ConnectionState::Disconnected;
                if self.turn.is_pending() {
                    self.finalize_streaming();
                    let notice = Message::ai(CONNECTION_LOST_NOTICE, None);
                    self.store.dispatch(MessageAction::AddMessage(notice));
                }
                self.advance(TurnEvent::Disconnected);
            }
        }
    }

    fn handle_frame(&mut self, frame: InboundFrame) {
        tracing::debug!(kind = frame.kind(), turn = ?self.turn, "Inbound frame");
        match frame {
            InboundFrame::Error { message } => {
                tracing::warn!(error = %message, "Backend reported an error");
                self.finalize_streaming();
                self.store.dispatch(MessageAction::AddMessage(Message::ai(
                    format!("Error: {message}"),
                    None,
                )));
                self.advance(TurnEvent::ProtocolError);
            }
            InboundFrame::StreamStart => {
                if self.store.streaming_message().is_some() {
                    tracing::warn!("Dropping streaming_start while a reply is already streaming");
                    return;
                }
                self.store.dispatch(MessageAction::add_streaming());
                self.advance(TurnEvent::StreamStarted);
            }
            InboundFrame::StreamChunk { chunk } => {
                self.store.dispatch(MessageAction::UpdateStreamingMessage(chunk));
            }
            InboundFrame::StreamEnd { response, metrics } => {
                self.store
                    .dispatch(MessageAction::CompleteStreamingMessage { response, metrics });
                self.advance(TurnEvent::StreamEnded);
            }
            InboundFrame::Reply { response, metrics } => {
                self.store
                    .dispatch(MessageAction::AddMessage(Message::ai(response, metrics)));
                self.advance(TurnEvent::ReplyReceived);
            }
        }
    }

    /// Close out a streaming reply with the text it has so far
    fn finalize_streaming(&mut self) {
        if let Some(response) = self.store.streaming_message().map(|m| m.response.clone()) {
            self.store.dispatch(MessageAction::CompleteStreamingMessage {
                response,
                metrics: None,
            });
        }
    }

    fn advance(&mut self, event: TurnEvent) {
        let next = self.turn.on(event);
        if next != self.turn {
            tracing::trace!(from = ?self.turn, to = ?next, event = ?event, "Turn transition");
        }
        self.turn = next;
    }

    fn check_ready(&self) -> Result<(), SendError> {
        if !self.connection.is_connected() {
            return Err(SendError::NotConnected);
        }
        if self.uploading {
            return Err(SendError::Uploading);
        }
        if !self.turn.accepts_input() {
            return Err(SendError::TurnPending);
        }
        Ok(())
    }

    /// Send a text turn
    ///
    /// The user message is appended only after the frame was queued.
    pub async fn send_text(&mut self, input: &str) -> Result<MessageId, SendError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SendError::Empty);
        }
        self.check_ready()?;

        self.transport.send(&OutboundFrame::new(text)).await?;

        let message = Message::user(text);
        let id = message.id;
        self.store.dispatch(MessageAction::AddMessage(message));
        self.advance(TurnEvent::Submitted);

        tracing::debug!(id = %id, "Sent message");
        Ok(id)
    }

    /// Rate a completed AI reply
    ///
    /// Returns whether the rating was applied.
    pub fn set_feedback(&mut self, message_id: MessageId, feedback: Feedback) -> bool {
        let applies = self
            .store
            .get(message_id)
            .is_some_and(Message::accepts_feedback);
        if applies {
            self.store
                .dispatch(MessageAction::SetFeedback { message_id, feedback });
        }
        applies
    }

    /// Validate an image and mark an upload as in flight
    pub fn begin_upload(
        &mut self,
        image: ImageAttachment,
        text: &str,
    ) -> Result<UploadTicket, SendError> {
        self.check_ready()?;
        image.validate(self.max_image_bytes)?;

        self.uploading = true;
        tracing::debug!(file = %image.file_name, bytes = image.size(), "Upload started");
        Ok(UploadTicket {
            image,
            message: text.trim().to_string(),
        })
    }

    /// Record the outcome of an upload started with [`begin_upload`](Self::begin_upload)
    ///
    /// On success the user message (with preview) and the AI analysis are
    /// appended. On failure nothing is appended.
    pub fn finish_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<UploadReply, UploadError>,
    ) -> Result<(), UploadError> {
        self.uploading = false;
        match result {
            Ok(reply) => {
                let preview = ticket.image.data_uri();
                self.store.dispatch(MessageAction::AddMessage(Message::user_with_image(
                    &ticket.message,
                    preview,
                )));
                let analysis = Message::ai(reply.analysis, reply.metrics);
                self.store.dispatch(MessageAction::AddMessage(analysis));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, file = %ticket.image.file_name, "Image upload failed");
                Err(e)
            }
        }
    }

    /// Validate, upload and record an image in one call
    pub async fn upload_image(
        &mut self,
        image: ImageAttachment,
        text: &str,
    ) -> Result<(), SendError> {
        let ticket = self.begin_upload(image, text)?;
        let result = self.uploader.upload(&ticket.image, &ticket.message).await;
        self.finish_upload(ticket, result)?;
        Ok(())
    }

    /// Close the streaming channel
    pub async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.connection = ConnectionState::Disconnected;
        self.transport.close().await
    }

    /// All messages in conversation order
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// The underlying store
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Current turn state
    pub fn turn(&self) -> TurnState {
        self.turn
    }

    /// Current connection state
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Whether an upload is in flight
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    /// Whether a new text or image turn may start
    pub fn accepts_input(&self) -> bool {
        self.check_ready().is_ok()
    }

    /// The uploader, for running requests outside the session
    pub fn uploader(&self) -> &U {
        &self.uploader
    }

    /// Largest image accepted by [`begin_upload`](Self::begin_upload)
    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }
}
