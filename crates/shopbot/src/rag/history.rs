//! Bounded rewrite history: the last few `Human:` / `AI:` lines.

use crate::llm::ChatMessage;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

const HUMAN_PREFIX: &str = "Human: ";
const AI_PREFIX: &str = "AI: ";

/// FIFO buffer of raw history lines, oldest first. Never holds more than
/// `capacity` entries.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: Vec<String>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, entry: impl Into<String>) {
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(entry.into());
    }

    pub fn add_human(&mut self, text: &str) {
        self.add(format!("{}{}", HUMAN_PREFIX, text));
    }

    pub fn add_ai(&mut self, text: &str) {
        self.add(format!("{}{}", AI_PREFIX, text));
    }

    pub fn get(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries as chat messages. Lines without a known prefix become user
    /// messages verbatim.
    pub fn as_messages(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|entry| {
                if let Some(text) = entry.strip_prefix(AI_PREFIX) {
                    ChatMessage::assistant(text)
                } else if let Some(text) = entry.strip_prefix(HUMAN_PREFIX) {
                    ChatMessage::user(text)
                } else {
                    ChatMessage::user(entry.as_str())
                }
            })
            .collect()
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
