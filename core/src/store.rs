//! Message Store
//!
//! The conversation as an ordered list of [`Message`]s, changed only by
//! applying a [`MessageAction`] through [`reduce`].
//!
//! `reduce` is a pure function of `(state, action)`. Anything that needs a
//! clock or a random id is resolved when the action is built (see
//! [`MessageAction::add_streaming`]), never inside the reducer.
//!
//! The reducer does not stop two messages from streaming at once. Keeping a
//! single in-flight reply is the session's job.

use chrono::{DateTime, Utc};

use crate::messages::{Feedback, Message, MessageId, Metrics};

/// The named transitions of the message list
#[derive(Clone, Debug, PartialEq)]
pub enum MessageAction {
    /// Append a fully formed message
    AddMessage(Message),

    /// Append an empty AI message that will receive streamed text
    AddStreamingMessage {
        /// ID for the new message
        id: MessageId,
        /// Creation time for the new message
        timestamp: DateTime<Utc>,
    },

    /// Append a chunk to the streaming message's text
    UpdateStreamingMessage(String),

    /// Replace the streaming message's text with the authoritative final
    /// text and attach its metrics
    CompleteStreamingMessage {
        /// Final text from the backend
        response: String,
        /// Metrics for the finished reply
        metrics: Option<Metrics>,
    },

    /// Rate a message
    SetFeedback {
        /// Target message
        message_id: MessageId,
        /// New rating
        feedback: Feedback,
    },
}

impl MessageAction {
    /// `AddStreamingMessage` with a fresh id and the current time
    pub fn add_streaming() -> Self {
        Self::AddStreamingMessage {
            id: MessageId::new(),
            timestamp: Utc::now(),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddMessage(_) => "ADD_MESSAGE",
            Self::AddStreamingMessage { .. } => "ADD_STREAMING_MESSAGE",
            Self::UpdateStreamingMessage(_) => "UPDATE_STREAMING_MESSAGE",
            Self::CompleteStreamingMessage { .. } => "COMPLETE_STREAMING_MESSAGE",
            Self::SetFeedback { .. } => "SET_FEEDBACK",
        }
    }
}

/// Apply one action to the message list
pub fn reduce(mut state: Vec<Message>, action: MessageAction) -> Vec<Message> {
    match action {
        MessageAction::AddMessage(message) => {
            state.push(message);
        }
        MessageAction::AddStreamingMessage { id, timestamp } => {
            state.push(Message::streaming_ai(id, timestamp));
        }
        MessageAction::UpdateStreamingMessage(chunk) => {
            for msg in state.iter_mut().filter(|m| m.is_streaming) {
                msg.response.push_str(&chunk);
            }
        }
        MessageAction::CompleteStreamingMessage { response, metrics } => {
            for msg in state.iter_mut().filter(|m| m.is_streaming) {
                msg.response.clone_from(&response);
                msg.is_streaming = false;
                msg.metrics.clone_from(&metrics);
            }
        }
        MessageAction::SetFeedback {
            message_id,
            feedback,
        } => {
            if let Some(msg) = state.iter_mut().find(|m| m.id == message_id) {
                msg.feedback = feedback;
            }
        }
    }
    state
}

/// Owner of the message list
///
/// All writes go through [`MessageStore::dispatch`].
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an action
    pub fn dispatch(&mut self, action: MessageAction) {
        tracing::trace!(action = action.name(), "Dispatching");
        let state = std::mem::take(&mut self.messages);
        self.messages = reduce(state, action);
    }

    /// All messages in conversation order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Look up a message by id
    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The message currently receiving streamed text, if any
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.is_streaming)
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the conversation is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Sender;
    use pretty_assertions::assert_eq;

    fn metrics() -> Metrics {
        Metrics {
            response_time_ms: 250.0,
            response_length: 10,
            word_count: 2,
            sentiment: "neutral".to_string(),
        }
    }

    fn streaming_state(text: &str) -> Vec<Message> {
        let state = reduce(Vec::new(), MessageAction::add_streaming());
        reduce(state, MessageAction::UpdateStreamingMessage(text.to_string()))
    }

    #[test]
    fn test_add_message_appends_in_order() {
        let inputs: Vec<Message> = ["one", "two", "three"]
            .iter()
            .map(|t| Message::user(*t))
            .collect();

        let mut state = Vec::new();
        let mut snapshots = Vec::new();
        for msg in &inputs {
            state = reduce(state, MessageAction::AddMessage(msg.clone()));
            snapshots.push(state.clone());
        }

        assert_eq!(state, inputs);
        // Earlier entries are never touched by later appends
        for (i, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(&state[..=i], snapshot.as_slice());
        }
    }

    #[test]
    fn test_add_streaming_message_shape() {
        let id = MessageId::new();
        let timestamp = Utc::now();
        let state = reduce(
            Vec::new(),
            MessageAction::AddStreamingMessage { id, timestamp },
        );

        assert_eq!(state.len(), 1);
        let msg = &state[0];
        assert_eq!(msg.id, id);
        assert_eq!(msg.timestamp, timestamp);
        assert_eq!(msg.sender, Sender::Ai);
        assert_eq!(msg.response, "");
        assert_eq!(msg.feedback, Feedback::None);
        assert!(msg.is_streaming);
    }

    #[test]
    fn test_reducer_alone_allows_two_streaming_messages() {
        let state = reduce(Vec::new(), MessageAction::add_streaming());
        assert_eq!(state.iter().filter(|m| m.is_streaming).count(), 1);

        let state = reduce(state, MessageAction::add_streaming());
        assert_eq!(state.iter().filter(|m| m.is_streaming).count(), 2);
    }

    #[test]
    fn test_update_streaming_is_order_dependent() {
        let forward = reduce(
            streaming_state("Hel"),
            MessageAction::UpdateStreamingMessage("lo".into()),
        );
        assert_eq!(forward[0].response, "Hello");

        let reverse = reduce(
            streaming_state("lo"),
            MessageAction::UpdateStreamingMessage("Hel".into()),
        );
        assert_eq!(reverse[0].response, "loHel");
    }

    #[test]
    fn test_update_without_streaming_message_is_noop() {
        let state = vec![Message::user("hi"), Message::ai("hello", None)];
        let after = reduce(state.clone(), MessageAction::UpdateStreamingMessage("x".into()));
        assert_eq!(after, state);
    }

    #[test]
    fn test_update_leaves_other_messages_alone() {
        let user = Message::user("question");
        let state = reduce(vec![user.clone()], MessageAction::add_streaming());
        let state = reduce(state, MessageAction::UpdateStreamingMessage("answer".into()));
        assert_eq!(state[0], user);
        assert_eq!(state[1].response, "answer");
    }

    #[test]
    fn test_complete_overwrites_accumulated_text() {
        let state = streaming_state("partial");
        let state = reduce(
            state,
            MessageAction::CompleteStreamingMessage {
                response: "final text".to_string(),
                metrics: Some(metrics()),
            },
        );

        assert_eq!(state[0].response, "final text");
        assert!(!state[0].is_streaming);
        assert_eq!(state[0].metrics, Some(metrics()));
    }

    #[test]
    fn test_complete_is_one_shot() {
        let state = reduce(
            streaming_state("a"),
            MessageAction::CompleteStreamingMessage {
                response: "first".to_string(),
                metrics: Some(metrics()),
            },
        );
        let again = reduce(
            state.clone(),
            MessageAction::CompleteStreamingMessage {
                response: "second".to_string(),
                metrics: None,
            },
        );
        assert_eq!(again, state);
    }

    #[test]
    fn test_set_feedback_replaces_only_feedback() {
        let reply = Message::ai("reply", Some(metrics()));
        let id = reply.id;
        let state = reduce(vec![Message::user("q"), reply.clone()], MessageAction::SetFeedback {
            message_id: id,
            feedback: Feedback::Like,
        });
        assert_eq!(state[1].feedback, Feedback::Like);
        assert_eq!(state[1].response, reply.response);
        assert_eq!(state[1].metrics, reply.metrics);

        // Ratings can be revised freely
        let state = reduce(state, MessageAction::SetFeedback {
            message_id: id,
            feedback: Feedback::Dislike,
        });
        assert_eq!(state[1].feedback, Feedback::Dislike);
    }

    #[test]
    fn test_set_feedback_unknown_id_is_noop() {
        let state = vec![Message::user("q"), Message::ai("a", Some(metrics()))];
        let after = reduce(
            state.clone(),
            MessageAction::SetFeedback {
                message_id: MessageId::new(),
                feedback: Feedback::Like,
            },
        );
        assert_eq!(after, state);
    }

    #[test]
    fn test_store_dispatch_and_lookup() {
        let mut store = MessageStore::new();
        assert!(store.is_empty());

        let user = Message::user("hi");
        let user_id = user.id;
        store.dispatch(MessageAction::AddMessage(user));
        store.dispatch(MessageAction::add_streaming());
        store.dispatch(MessageAction::UpdateStreamingMessage("yo".into()));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(user_id).map(|m| m.response.as_str()), Some("hi"));
        assert_eq!(store.streaming_message().map(|m| m.response.as_str()), Some("yo"));
    }
}
