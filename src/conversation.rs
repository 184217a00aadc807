//! Conversation log for the active consultation
//!
//! The service runs one consultation at a time. The log is an ordered list
//! of role-tagged messages whose first entry is always the triage persona
//! prompt; it is re-seeded whenever a consultation finishes.

use crate::llm::provider::{Message, MessageRole};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Conversation shared between request handlers
pub type SharedConversation = Arc<Mutex<Conversation>>;

#[derive(Debug, Clone)]
pub struct Conversation {
    id: Uuid,
    started_at: DateTime<Utc>,
    system_prompt: String,
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        let system_prompt = system_prompt.into();
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            messages: vec![Message::system(system_prompt.clone())],
            system_prompt,
        }
    }

    pub fn shared(system_prompt: impl Into<String>) -> SharedConversation {
        Arc::new(Mutex::new(Self::new(system_prompt)))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages, system prompt included
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system prompt is present
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Number of patient messages so far
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }

    /// Start a fresh consultation with the same persona prompt
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::system(self.system_prompt.clone()));
        self.id = Uuid::new_v4();
        self.started_at = Utc::now();
    }

    /// Render the log as plain text for embedding into a prompt
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
