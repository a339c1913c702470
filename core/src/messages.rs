//! Conversation Messages
//!
//! The records held by the [`MessageStore`](crate::store::MessageStore).
//! A message is created once and afterwards only two things may change:
//! the text and streaming flag of the reply currently being streamed, and
//! the feedback on any message.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Placeholder text for an image sent without accompanying text
pub const IMAGE_ONLY_LABEL: &str = "[Image Attached]";

/// Message identifier
///
/// Generated client-side and stable for the lifetime of the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person at the keyboard
    User,
    /// The backend's reply
    Ai,
}

/// User rating of a reply
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    /// Thumbs up
    Like,
    /// Thumbs down
    Dislike,
    /// Not rated
    #[default]
    None,
}

/// Sentiment labels with a defined presentation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sentiment {
    /// "positive"
    Positive,
    /// "negative"
    Negative,
    /// "neutral"
    Neutral,
}

impl Sentiment {
    /// Parse a backend label, ignoring case
    ///
    /// Unknown labels return `None`; they are still valid metrics data.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// Reply statistics computed by the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Time from request to final token, in milliseconds
    pub response_time_ms: f64,
    /// Length of the reply in characters
    #[serde(deserialize_with = "count")]
    pub response_length: u64,
    /// Whitespace-separated word count
    #[serde(deserialize_with = "count")]
    pub word_count: u64,
    /// Free-form sentiment label
    pub sentiment: String,
}

/// A count sent as any JSON number with no fractional part
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Float(f64),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(n) => Ok(n),
        Number::Float(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
        Number::Float(f) => Err(D::Error::custom(format!("expected a whole count, got {f}"))),
    }
}

impl Metrics {
    /// The sentiment label, if it is one with a presentation mapping
    pub fn sentiment_kind(&self) -> Option<Sentiment> {
        Sentiment::from_label(&self.sentiment)
    }
}

/// A single entry in the conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub sender: Sender,
    /// Message text
    pub response: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Reply statistics, only on completed AI messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    /// User rating
    #[serde(default)]
    pub feedback: Feedback,
    /// Whether text is still arriving for this message
    #[serde(default)]
    pub is_streaming: bool,
    /// Inline `data:` URI of an uploaded image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Message {
    fn new(sender: Sender, response: String) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            response,
            timestamp: Utc::now(),
            metrics: None,
            feedback: Feedback::None,
            is_streaming: false,
            image: None,
        }
    }

    /// A message typed by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text.into())
    }

    /// A user message carrying an uploaded image
    ///
    /// Empty text is replaced with [`IMAGE_ONLY_LABEL`].
    pub fn user_with_image(text: &str, data_uri: String) -> Self {
        let text = text.trim();
        let label = if text.is_empty() { IMAGE_ONLY_LABEL } else { text };
        Self {
            image: Some(data_uri),
            ..Self::new(Sender::User, label.to_string())
        }
    }

    /// A complete (non-streamed) AI reply
    pub fn ai(text: impl Into<String>, metrics: Option<Metrics>) -> Self {
        Self {
            metrics,
            ..Self::new(Sender::Ai, text.into())
        }
    }

    /// An empty AI reply that will receive streamed text
    pub fn streaming_ai(id: MessageId, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            sender: Sender::Ai,
            response: String::new(),
            timestamp,
            metrics: None,
            feedback: Feedback::None,
            is_streaming: true,
            image: None,
        }
    }

    /// Whether feedback controls apply to this message
    pub fn accepts_feedback(&self) -> bool {
        self.sender == Sender::Ai && self.metrics.is_some() && !self.is_streaming
    }
}
