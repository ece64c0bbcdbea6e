//! Chat messages and per-channel transcripts

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Display name the player chats under
pub const SELF_NAME: &str = "Admin_1";

/// Who wrote a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Author {
    User { name: String },
    Agent { name: String },
}

impl Author {
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Author::User { name: name.into() }
    }

    #[must_use]
    pub fn agent(name: impl Into<String>) -> Self {
        Author::Agent { name: name.into() }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Author::User { name } | Author::Agent { name } => name,
        }
    }

    #[must_use]
    pub fn is_agent(&self) -> bool {
        matches!(self, Author::Agent { .. })
    }
}

/// One line of a transcript; never modified after creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_data: Option<Value>,
}

impl Message {
    #[must_use]
    pub fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            author,
            timestamp: Utc::now(),
            display_data: None,
        }
    }

    #[must_use]
    pub fn with_display_data(mut self, data: Option<Value>) -> Self {
        self.display_data = data;
        self
    }

    /// Wall-clock time as the chat shows it, e.g. `3:07 PM`
    #[must_use]
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%-I:%M %p")
            .to_string()
    }
}

/// Append-only, insertion-ordered list of messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages written by the agent, oldest first
    #[must_use]
    pub fn agent_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.author.is_agent())
    }
}
