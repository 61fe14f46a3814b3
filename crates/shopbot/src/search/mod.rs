//! Vector search over the shared product index.

use async_trait::async_trait;
use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::types::Passage;

pub mod azure;

pub use azure::AzureSearchIndex;

/// Nearest-neighbour search against a hosted index.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Up to `top_k` passages, best first.
    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Passage>>;
}

/// Embeds a query and searches the index with it.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorSearch>,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorSearch>,
        top_k: usize,
    ) -> Self {
        Self { embedder, index, top_k }
    }

    /// Same services, different passage count.
    pub fn with_top_k(&self, top_k: usize) -> Self {
        Self {
            top_k,
            ..self.clone()
        }
    }

    pub async fn retrieve(&self, query: &str) -> Result<Vec<Passage>> {
        let vector = self.embedder.embed(query).await?;
        let passages = self.index.search(&vector, self.top_k).await?;
        tracing::debug!(query = %query, hits = passages.len(), "Retrieved passages");
        Ok(passages)
    }
}
