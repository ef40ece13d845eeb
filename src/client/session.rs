//! Client-side chat sessions, keyed by book and optional character.

use std::collections::HashMap;
use std::fmt;

use crate::llm::ChatTurn;
use crate::relay::RelayEvent;

/// Identifies one chat buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    General { book_id: String },
    Interview { book_id: String, character_id: String },
}

impl SessionKey {
    pub fn general(book_id: impl Into<String>) -> Self {
        SessionKey::General {
            book_id: book_id.into(),
        }
    }

    pub fn interview(book_id: impl Into<String>, character_id: impl Into<String>) -> Self {
        SessionKey::Interview {
            book_id: book_id.into(),
            character_id: character_id.into(),
        }
    }

    /// General log when no character is given.
    pub fn for_target(book_id: &str, character_id: Option<&str>) -> Self {
        match character_id {
            Some(character_id) => Self::interview(book_id, character_id),
            None => Self::general(book_id),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::General { book_id } => write!(f, "general:{book_id}"),
            SessionKey::Interview {
                book_id,
                character_id,
            } => write!(f, "interview:{book_id}:{character_id}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub messages: Vec<ChatTurn>,
    pub is_streaming: bool,
    /// Text received so far for the reply in flight.
    pub streamed_text: String,
    pub error: Option<String>,
}

impl SessionState {
    /// Record the user's turn and open a new reply.
    pub fn begin(&mut self, user_message: impl Into<String>) {
        self.messages.push(ChatTurn::user(user_message));
        self.is_streaming = true;
        self.streamed_text.clear();
        self.error = None;
    }

    /// Fold one event into the session.
    pub fn apply(&mut self, event: &RelayEvent) {
        match event {
            RelayEvent::Text(fragment) => self.streamed_text.push_str(fragment),
            RelayEvent::Done => self.finish(),
            RelayEvent::Error(message) => self.fail(message.clone()),
        }
    }

    /// End the reply with an error. Text already received is kept.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.finish();
    }

    fn finish(&mut self) {
        self.is_streaming = false;
        if !self.streamed_text.is_empty() {
            let reply = std::mem::take(&mut self.streamed_text);
            self.messages.push(ChatTurn::assistant(reply));
        }
    }
}

/// Keyed store of sessions. Records are created on first access.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionKey, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, key: &SessionKey) -> &mut SessionState {
        self.sessions.entry(key.clone()).or_default()
    }

    pub fn get(&self, key: &SessionKey) -> Option<&SessionState> {
        self.sessions.get(key)
    }

    /// Replace the record with a fresh one.
    pub fn clear(&mut self, key: &SessionKey) {
        self.sessions.insert(key.clone(), SessionState::default());
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
