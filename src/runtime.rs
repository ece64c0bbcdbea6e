//! Runtime for the chat session
//!
//! One tokio task owns the channels, transcripts, the Helper AI state and its
//! pending replies. Surfaces talk to it through a [`SessionHandle`] and watch
//! [`SurfaceEvent`]s on a broadcast channel.

mod executor;
pub mod pending;


pub use executor::ChatSession;
pub use pending::PendingReplies;

use crate::error::ChatError;
use crate::state_machine::{ConversationState, ScriptConfig};
use crate::transcript::{Message, Transcript, SELF_NAME};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};

/// The only channel with a scripted agent behind it
pub const HELPER_CHANNEL: &str = "Helper AI";

/// Static setup for a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Channel names in display order; the helper channel is always included
    pub channels: Vec<String>,
    pub script: ScriptConfig,
    /// Name the player's messages are signed with
    pub user_name: String,
}

impl SessionConfig {
    #[must_use]
    pub fn with_channel(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.channels.contains(&name) {
            self.channels.push(name);
        }
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channels: vec![HELPER_CHANNEL.to_string()],
            script: ScriptConfig::helper(),
            user_name: SELF_NAME.to_string(),
        }
    }
}

/// Events sent to the chat surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceEvent {
    /// A message was appended to `channel`'s transcript
    Message { channel: String, message: Message },
    /// Show or hide the "Helper AI is typing…" indicator
    Composing { channel: String, active: bool },
    /// The scripted agent's state changed
    StateChange {
        channel: String,
        state: ConversationState,
    },
}

/// Requests from handles to the session task
#[derive(Debug)]
pub(crate) enum Command {
    Select {
        channel: String,
        reply: oneshot::Sender<Result<(), ChatError>>,
    },
    Send {
        text: String,
        reply: oneshot::Sender<Result<Message, ChatError>>,
    },
    Transcript {
        channel: String,
        reply: oneshot::Sender<Result<Transcript, ChatError>>,
    },
    HelperState {
        reply: oneshot::Sender<ConversationState>,
    },
    ActiveChannel {
        reply: oneshot::Sender<Option<String>>,
    },
    Channels {
        reply: oneshot::Sender<Vec<String>>,
    },
    CancelPending {
        reply: oneshot::Sender<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to interact with a running chat session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<SurfaceEvent>,
}

impl SessionHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<Command>,
        broadcast_tx: broadcast::Sender<SurfaceEvent>,
    ) -> Self {
        Self {
            command_tx,
            broadcast_tx,
        }
    }

    /// Another receiver for surface events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.broadcast_tx.subscribe()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ChatError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(command(tx))
            .await
            .map_err(|_| ChatError::SessionClosed)?;
        rx.await.map_err(|_| ChatError::SessionClosed)
    }

    /// Make `channel` active, cancelling replies still pending for the old one.
    /// Selecting the helper channel restarts its script.
    ///
    /// # Errors
    ///
    /// [`ChatError::UnknownChannel`] if the session has no such channel, or
    /// [`ChatError::SessionClosed`] once the session task has stopped.
    pub async fn select_channel(&self, channel: impl Into<String>) -> Result<(), ChatError> {
        let channel = channel.into();
        self.request(|reply| Command::Select { channel, reply })
            .await?
    }

    /// Submit user text to the active channel; returns the appended message
    ///
    /// # Errors
    ///
    /// [`ChatError::EmptyMessage`] for blank text, [`ChatError::NoActiveChannel`]
    /// before any channel is selected, [`ChatError::MessagingDisabled`] outside
    /// the helper channel, or [`ChatError::SessionClosed`] once the session
    /// task has stopped.
    pub async fn send(&self, text: impl Into<String>) -> Result<Message, ChatError> {
        let text = text.into();
        self.request(|reply| Command::Send { text, reply }).await?
    }

    /// Copy of `channel`'s transcript
    ///
    /// # Errors
    ///
    /// [`ChatError::UnknownChannel`] if the session has no such channel, or
    /// [`ChatError::SessionClosed`] once the session task has stopped.
    pub async fn transcript(&self, channel: impl Into<String>) -> Result<Transcript, ChatError> {
        let channel = channel.into();
        self.request(|reply| Command::Transcript { channel, reply })
            .await?
    }

    /// Current Helper AI state
    ///
    /// # Errors
    ///
    /// [`ChatError::SessionClosed`] once the session task has stopped.
    pub async fn helper_state(&self) -> Result<ConversationState, ChatError> {
        self.request(|reply| Command::HelperState { reply }).await
    }

    /// Selected channel, if any
    ///
    /// # Errors
    ///
    /// [`ChatError::SessionClosed`] once the session task has stopped.
    pub async fn active_channel(&self) -> Result<Option<String>, ChatError> {
        self.request(|reply| Command::ActiveChannel { reply }).await
    }

    /// Channel names in display order
    ///
    /// # Errors
    ///
    /// [`ChatError::SessionClosed`] once the session task has stopped.
    pub async fn channels(&self) -> Result<Vec<String>, ChatError> {
        self.request(|reply| Command::Channels { reply }).await
    }

    /// Cancel every reply not yet delivered and roll the helper back to where
    /// its last delivered reply left it; returns how many were dropped
    ///
    /// # Errors
    ///
    /// [`ChatError::SessionClosed`] once the session task has stopped.
    pub async fn cancel_pending(&self) -> Result<usize, ChatError> {
        self.request(|reply| Command::CancelPending { reply }).await
    }

    /// Cancel pending replies and stop the session task
    ///
    /// # Errors
    ///
    /// [`ChatError::SessionClosed`] once the session task has stopped.
    pub async fn shutdown(&self) -> Result<(), ChatError> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}
