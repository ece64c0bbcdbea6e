//! Effects produced by state transitions

use super::state::StateUpdate;
use serde_json::Value;
use std::time::Duration;

/// An agent message waiting to be delivered
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Opaque payload for the surface (e.g. the call-to-action on the accept
    /// reply); the engine never looks inside
    pub display_data: Option<Value>,
    /// Applied to the conversation when this reply is delivered, never earlier
    pub on_delivery: Option<StateUpdate>,
}

impl Reply {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            display_data: None,
            on_delivery: None,
        }
    }

    #[must_use]
    pub fn with_display_data(mut self, data: Value) -> Self {
        self.display_data = Some(data);
        self
    }

    #[must_use]
    pub fn on_delivery(mut self, update: StateUpdate) -> Self {
        self.on_delivery = Some(update);
        self
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver `reply` after `delay`, measured from the transition
    ScheduleReply { delay: Duration, reply: Reply },

    /// The conversation state changed; tell the surface
    NotifyState,
}

impl Effect {
    #[must_use]
    pub fn schedule_reply(delay: Duration, reply: Reply) -> Self {
        Effect::ScheduleReply { delay, reply }
    }

    /// The scheduled reply, if this effect is one
    #[must_use]
    pub fn as_reply(&self) -> Option<(Duration, &Reply)> {
        match self {
            Effect::ScheduleReply { delay, reply } => Some((*delay, reply)),
            Effect::NotifyState => None,
        }
    }
}
