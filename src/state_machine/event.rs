//! Events that can occur in a conversation

use super::state::StateUpdate;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The user submitted a (trimmed, non-empty) message
    UserMessage { text: String },

    /// A scheduled reply fired and was appended to the transcript
    ReplyDelivered { on_delivery: Option<StateUpdate> },
}

impl Event {
    #[must_use]
    pub fn user_message(text: impl Into<String>) -> Self {
        Event::UserMessage { text: text.into() }
    }
}
