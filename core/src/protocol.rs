//! Streaming Channel Wire Protocol
//!
//! JSON text frames exchanged over the WebSocket.
//!
//! The backend does not use one discriminant consistently: streamed replies
//! carry a `type` tag, legacy replies are a bare `response`, and errors are
//! signalled by an `error` field that may appear with or without a `type`.
//! [`InboundFrame::parse`] folds all of that into one closed enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::Metrics;

/// Frame sent for each user turn
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutboundFrame {
    /// The user's text
    pub message: String,
    /// Always `true`; this client only requests streamed replies
    pub streaming: bool,
}

impl OutboundFrame {
    /// A streamed-reply request for `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            streaming: true,
        }
    }

    /// Serialize to the text frame payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A frame received from the backend
#[derive(Clone, Debug, PartialEq)]
pub enum InboundFrame {
    /// The backend reported a failure
    Error {
        /// Error text from the backend
        message: String,
    },
    /// A streamed reply begins
    StreamStart,
    /// More text for the streamed reply
    StreamChunk {
        /// Text to append
        chunk: String,
    },
    /// The streamed reply is complete
    StreamEnd {
        /// Authoritative full text
        response: String,
        /// Reply statistics
        metrics: Option<Metrics>,
    },
    /// A complete reply delivered in one frame
    Reply {
        /// Reply text
        response: String,
        /// Reply statistics
        metrics: Option<Metrics>,
    },
}

/// Frames that could not be turned into an [`InboundFrame`]
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload is not a JSON object of the expected field types
    #[error("invalid frame JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that matches no known frame shape
    #[error("unrecognized frame (type: {kind:?})")]
    Unrecognized {
        /// The `type` tag, if there was one
        kind: Option<String>,
    },
}

const STREAMING_START: &str = "streaming_start";
const STREAMING_CHUNK: &str = "streaming_chunk";
const STREAMING_END: &str = "streaming_end";

/// Every field any frame shape may carry
#[derive(Debug, Default, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    error: Option<String>,
    chunk: Option<String>,
    response: Option<String>,
    metrics: Option<serde_json::Value>,
}

/// Metrics are advisory; a malformed block never sinks the frame carrying it
fn parse_metrics(value: Option<serde_json::Value>) -> Option<Metrics> {
    let value = value.filter(|v| !v.is_null())?;
    match serde_json::from_value(value) {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed metrics");
            None
        }
    }
}

impl InboundFrame {
    /// Classify a text frame
    ///
    /// Precedence: a non-empty `error` wins over any `type`, then the
    /// `type` tag, then a bare non-empty `response`.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawFrame) -> Result<Self, FrameError> {
        if let Some(message) = raw.error.filter(|e| !e.is_empty()) {
            return Ok(Self::Error { message });
        }

        match raw.kind.as_deref() {
            Some(STREAMING_START) => Ok(Self::StreamStart),
            Some(STREAMING_CHUNK) => match raw.chunk {
                Some(chunk) => Ok(Self::StreamChunk { chunk }),
                None => Err(FrameError::Unrecognized { kind: raw.kind }),
            },
            Some(STREAMING_END) => match raw.response {
                Some(response) => Ok(Self::StreamEnd {
                    response,
                    metrics: parse_metrics(raw.metrics),
                }),
                None => Err(FrameError::Unrecognized { kind: raw.kind }),
            },
            Some(_) => Err(FrameError::Unrecognized { kind: raw.kind }),
            None => match raw.response.filter(|r| !r.is_empty()) {
                Some(response) => Ok(Self::Reply {
                    response,
                    metrics: parse_metrics(raw.metrics),
                }),
                None => Err(FrameError::Unrecognized { kind: None }),
            },
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::StreamStart => STREAMING_START,
            Self::StreamChunk { .. } => STREAMING_CHUNK,
            Self::StreamEnd { .. } => STREAMING_END,
            Self::Reply { .. } => "reply",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outbound_frame_shape() {
        let json = OutboundFrame::new("Hi").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({"message": "Hi", "streaming": true}));
    }

    #[test]
    fn test_parse_stream_frames() {
        assert_eq!(
            InboundFrame::parse(r#"{"type":"streaming_start","timestamp":1718000000.5}"#).unwrap(),
            InboundFrame::StreamStart
        );
        assert_eq!(
            InboundFrame::parse(r#"{"type":"streaming_chunk","chunk":"He","chunk_index":1}"#)
                .unwrap(),
            InboundFrame::StreamChunk { chunk: "He".into() }
        );

        let end = InboundFrame::parse(
            r#"{"type":"streaming_end","response":"Hello!","metrics":{"response_time_ms":10.5,"response_length":6,"word_count":1,"sentiment":"positive"}}"#,
        )
        .unwrap();
        match end {
            InboundFrame::StreamEnd { response, metrics } => {
                assert_eq!(response, "Hello!");
                assert_eq!(metrics.map(|m| m.word_count), Some(1));
            }
            other => panic!("expected StreamEnd, got {other:?}"),
        }
    }

    #[test]
    fn test_error_field_wins_over_type() {
        let frame =
            InboundFrame::parse(r#"{"type":"streaming_error","error":"rate limited"}"#).unwrap();
        assert_eq!(frame, InboundFrame::Error { message: "rate limited".into() });

        let frame = InboundFrame::parse(r#"{"error":"No message provided"}"#).unwrap();
        assert_eq!(frame.kind(), "error");
    }

    #[test]
    fn test_legacy_reply_without_type() {
        let frame = InboundFrame::parse(r#"{"response":"plain answer"}"#).unwrap();
        assert_eq!(
            frame,
            InboundFrame::Reply { response: "plain answer".into(), metrics: None }
        );
    }

    #[test]
    fn test_malformed_metrics_keep_the_frame() {
        let end = InboundFrame::parse(
            r#"{"type":"streaming_end","response":"Hello!","metrics":{"response_time_ms":10,"response_length":6.0,"word_count":1.0,"sentiment":"positive"}}"#,
        )
        .unwrap();
        match end {
            InboundFrame::StreamEnd { metrics, .. } => {
                let metrics = metrics.unwrap();
                assert_eq!(metrics.response_length, 6);
                assert_eq!(metrics.word_count, 1);
            }
            other => panic!("expected StreamEnd, got {other:?}"),
        }

        let end = InboundFrame::parse(
            r#"{"type":"streaming_end","response":"Hello!","metrics":{"response_time_ms":10,"response_length":6}}"#,
        )
        .unwrap();
        assert_eq!(
            end,
            InboundFrame::StreamEnd { response: "Hello!".into(), metrics: None }
        );

        let reply = InboundFrame::parse(r#"{"response":"hi","metrics":"fast"}"#).unwrap();
        assert_eq!(reply, InboundFrame::Reply { response: "hi".into(), metrics: None });
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert!(matches!(
            InboundFrame::parse(r#"{"type":"heartbeat"}"#),
            Err(FrameError::Unrecognized { kind: Some(_) })
        ));
        assert!(matches!(
            InboundFrame::parse(r#"{"type":"streaming_chunk"}"#),
            Err(FrameError::Unrecognized { .. })
        ));
        assert!(matches!(
            InboundFrame::parse(r#"{"error":"","response":""}"#),
            Err(FrameError::Unrecognized { kind: None })
        ));
        assert!(matches!(InboundFrame::parse("not json"), Err(FrameError::Json(_))));
    }
}
