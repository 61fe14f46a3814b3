use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A passage returned by the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub id: String,
    pub score: f32,
    pub content: String,
    pub metadata: HashMap<String, String>,
}

impl Passage {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: 0.0,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.insert("source".to_string(), source.into());
        self
    }

    /// Document the passage came from (the file name the answers cite).
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").map(String::as_str)
    }

    /// Key used to collapse the same chunk returned by different queries.
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.source().unwrap_or_default().to_string(),
            self.content.clone(),
        )
    }
}
