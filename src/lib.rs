//! Helper AI - scripted chat agent
//!
//! A pure state machine walks the Helper AI through its intro script and its
//! one question; a small tokio runtime turns the resulting effects into timed
//! messages on a per-channel transcript.

pub mod error;
pub mod runtime;
pub mod state_machine;
pub mod transcript;

pub use error::ChatError;
pub use runtime::{ChatSession, SessionConfig, SessionHandle, SurfaceEvent, HELPER_CHANNEL};
pub use state_machine::{submit, ConversationState, Effect, ScriptConfig, TransitionResult};
pub use transcript::{Author, Message, Transcript};
