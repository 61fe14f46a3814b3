pub mod chat;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod llm;
pub mod rag;
pub mod routing;
pub mod search;
pub mod types;

mod http;

#[cfg(test)]
mod test_support;

// Re-export primary types for convenience
pub use chat::{ChatEngine, ChatSession, SessionStore, SubmitOutcome};
pub use config::{BotConfig, HistoryCommit, PipelineKind};
pub use error::{BotError, Result};
pub use routing::{Intent, IntentRouter, Route, RouteMatch};
pub use types::Passage;

// Re-export LLM types
pub use llm::{ApiProvider, ChatMessage, ChatModel, ChatRole, GenerationConfig, ProviderInfo};

pub use uuid::Uuid;
