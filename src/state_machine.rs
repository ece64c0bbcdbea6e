//! Scripted Helper AI state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions: the
//! runtime feeds events in, applies the new state, and executes the effects.

mod effect;
pub mod event;
pub mod jitter;
pub mod matcher;
pub mod script;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Reply};
pub use event::Event;
pub use jitter::{FixedJitter, Jitter, RandomJitter};
pub use matcher::matches_good_boy_answer;
pub use script::{DelayWindow, ScriptConfig, ScriptLine};
pub use state::{ConversationState, Phase, StateUpdate};
pub use transition::{submit, transition, TransitionResult};
