//! Conversation state types

use serde::{Deserialize, Serialize};

/// Step at which the intro script has asked its question; anything at or past
/// this point only nudges.
pub const QUESTION_STEP: u32 = 4;

/// Scripted-agent state for one conversation.
///
/// Exactly one of three things drives what happens next: the intro script
/// (`step`), the open question (`awaiting_answer`), or the terminal `solved`
/// flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    /// Position in the intro script
    pub step: u32,
    /// The question has been asked and no qualifying reply has arrived yet
    pub awaiting_answer: bool,
    /// A qualifying reply was accepted (terminal)
    pub solved: bool,
}

impl ConversationState {
    /// Fresh state for a newly selected conversation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Which branch of the script a submission will take
    #[must_use]
    pub fn phase(self) -> Phase {
        if self.solved {
            Phase::Solved
        } else if self.awaiting_answer {
            Phase::AwaitingAnswer
        } else if self.step >= QUESTION_STEP {
            Phase::Nudging
        } else {
            Phase::Intro { step: self.step }
        }
    }

    /// Check the state-level invariant (`solved` excludes `awaiting_answer`)
    #[must_use]
    pub fn is_consistent(self) -> bool {
        !(self.solved && self.awaiting_answer)
    }

    /// Apply a deferred update from a delivered reply. Solved conversations
    /// and ones already waiting on the answer are left alone.
    #[must_use]
    pub fn with_update(self, update: StateUpdate) -> Self {
        match update {
            StateUpdate::AwaitAnswer if !self.solved && !self.awaiting_answer => Self {
                awaiting_answer: true,
                ..self
            },
            StateUpdate::AwaitAnswer => self,
        }
    }
}

/// Coarse view of a [`ConversationState`], used for logging and surface events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Phase {
    /// Walking the intro script
    Intro { step: u32 },
    /// Question is scheduled but has not been delivered yet
    Nudging,
    /// Question delivered, waiting for the answer
    AwaitingAnswer,
    /// Answer accepted
    Solved,
}

/// Deferred state change carried by a scheduled reply, applied only when that
/// reply is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateUpdate {
    /// The question has been put to the user
    AwaitAnswer,
}
