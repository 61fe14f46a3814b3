//! RAG building blocks - history, prompts, query rewriting, retrieval and answer chains.

pub mod chains;
pub mod conversational;
pub mod history;
pub mod multi_query;
pub mod prompts;
pub mod query_rewriter;

// Re-export commonly used types
pub use chains::{chain_for, ChainKind, ProductChains, FALLBACK_ANSWER};
pub use conversational::ConversationalChain;
pub use history::{HistoryBuffer, DEFAULT_HISTORY_CAPACITY};
pub use multi_query::MultiQueryRetriever;
pub use prompts::{format_passages, PromptTemplate};
pub use query_rewriter::QueryRewriter;
