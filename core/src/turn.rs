//! Turn and Connection State
//!
//! A turn is one user message and the reply to it. [`TurnState`] replaces a
//! single "loading" flag with an explicit machine so every inbound event
//! and a dropped connection each have a defined outcome.

/// Lifecycle of the streaming connection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket
    #[default]
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Open and ready to send
    Connected,
}

impl ConnectionState {
    /// Whether frames may be sent
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
        }
    }
}

/// Progress of the current turn
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TurnState {
    /// Nothing in flight
    #[default]
    Idle,
    /// User message sent, nothing back yet
    AwaitingReply,
    /// Reply text is arriving
    Streaming,
}

/// Inputs to the turn machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnEvent {
    /// The user's message went out
    Submitted,
    /// `streaming_start` arrived
    StreamStarted,
    /// `streaming_end` arrived
    StreamEnded,
    /// A complete non-streamed reply arrived
    ReplyReceived,
    /// The backend sent an `error` frame
    ProtocolError,
    /// The connection closed
    Disconnected,
}

impl TurnState {
    /// Transition on an event
    ///
    /// Events that make no sense in the current state leave it unchanged.
    #[must_use]
    pub fn on(self, event: TurnEvent) -> Self {
        match (self, event) {
            (Self::Idle, TurnEvent::Submitted) => Self::AwaitingReply,
            (Self::Idle | Self::AwaitingReply, TurnEvent::StreamStarted) => Self::Streaming,
            (Self::AwaitingReply, TurnEvent::ReplyReceived) => Self::Idle,
            (Self::Streaming, TurnEvent::StreamEnded) => Self::Idle,
            (_, TurnEvent::ProtocolError | TurnEvent::Disconnected) => Self::Idle,
            (state, _) => state,
        }
    }

    /// Whether a new turn may start
    pub fn accepts_input(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the view should show a waiting indicator
    pub fn shows_loading(&self) -> bool {
        matches!(self, Self::AwaitingReply)
    }

    /// Whether a turn is in flight
    pub fn is_pending(&self) -> bool {
        !self.accepts_input()
    }
}
