//! Per-conversation state and the store that owns it.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{ChatPhase, ConversationTurn, Speaker};
use crate::rag::HistoryBuffer;

#[derive(Debug)]
pub struct ChatSession {
    pub id: Uuid,
    pub history: HistoryBuffer,
    /// Append-only; survives history eviction.
    pub transcript: Vec<ConversationTurn>,
    pub phase: ChatPhase,
}

impl ChatSession {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: HistoryBuffer::new(history_capacity),
            transcript: Vec::new(),
            phase: ChatPhase::Idle,
        }
    }

    pub(crate) fn record_exchange(&mut self, question: &str, answer: &str) {
        self.transcript.push(ConversationTurn::new(Speaker::User, question));
        self.transcript.push(ConversationTurn::new(Speaker::Bot, answer));
    }
}

pub type SharedSession = Arc<tokio::sync::Mutex<ChatSession>>;

/// Live sessions by id. The map lock is only held for lookups; each session
/// has its own async lock that a submission holds across service calls.
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
    history_capacity: usize,
}

impl SessionStore {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_capacity,
        }
    }

    pub fn create(&self) -> (Uuid, SharedSession) {
        let session = ChatSession::new(self.history_capacity);
        let id = session.id;
        let shared = Arc::new(tokio::sync::Mutex::new(session));
        self.sessions.lock().insert(id, shared.clone());
        tracing::info!(session = %id, "Session created");
        (id, shared)
    }

    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.sessions.lock().get(id).cloned()
    }

    /// Drop a session. Returns whether it existed.
    pub fn end(&self, id: &Uuid) -> bool {
        let removed = self.sessions.lock().remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "Session ended");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
