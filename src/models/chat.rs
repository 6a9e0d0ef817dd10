use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::event::{AiSuggestion, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self::new(Sender::Ai, text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Idle,
    AwaitingIdentification,
    AwaitingConfirmation,
}

/// A reschedule computed from a snapshot of the calendar, held until the
/// user confirms or cancels it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedChange {
    pub id: String,
    pub original: Event,
    pub updated: Event,
    pub suggestion: AiSuggestion,
    /// Full collection to write on confirm.
    #[serde(skip)]
    pub events: Vec<Event>,
    pub staged_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    pub state: ConversationState,
    pub staged: Option<StagedChange>,
    pub transcript: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            state: ConversationState::Idle,
            staged: None,
            transcript: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.state = ConversationState::Idle;
        self.staged = None;
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
