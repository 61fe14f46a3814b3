//! In-process stand-ins for the hosted services, shared by unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::embeddings::EmbeddingProvider;
use crate::error::{BotError, Result};
use crate::llm::{ChatMessage, ChatModel, ChatProvider, GenerationConfig, ProviderInfo};
use crate::routing::{Route, RouteClassifier, RouteMatch};
use crate::search::{Retriever, VectorSearch};
use crate::types::Passage;

const KEYWORDS: [&str; 8] = [
    "headphone",
    "laptop",
    "smartphone",
    "smartwatch",
    "theater",
    "how",
    "weather",
    "going",
];

/// Embeds text as keyword counts, so similarity follows shared vocabulary.
#[derive(Default)]
pub struct KeywordEmbedder {
    pub texts: Mutex<Vec<String>>,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.texts.lock().len()
    }
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .map(|k| lower.matches(k).count() as f32)
        .collect()
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.texts.lock().push(text.to_string());
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.texts.lock().extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        KEYWORDS.len()
    }

    fn model_name(&self) -> &str {
        "keyword-counts"
    }
}

/// Returns the same passages for every query.
pub struct StaticIndex {
    pub passages: Vec<Passage>,
    pub searches: Mutex<usize>,
}

impl StaticIndex {
    pub fn new(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            searches: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.searches.lock()
    }
}

#[async_trait]
impl VectorSearch for StaticIndex {
    async fn search(&self, _query_vector: &[f32], top_k: usize) -> Result<Vec<Passage>> {
        *self.searches.lock() += 1;
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

type Reply = Box<dyn Fn(&[ChatMessage]) -> Result<String> + Send + Sync>;

/// Chat model whose replies come from a closure; every request is recorded.
pub struct ScriptedChat {
    reply: Reply,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn new(reply: impl Fn(&[ChatMessage]) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Fails every request the way an unreachable service would.
    pub fn failing() -> Self {
        Self::new(|_| {
            Err(BotError::Api {
                service: "chat completion",
                status: 503,
                body: "unavailable".to_string(),
            })
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Content of the last message of every request, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|msgs| msgs.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _config: &GenerationConfig,
    ) -> Result<String> {
        self.requests.lock().push(messages.to_vec());
        (self.reply)(messages)
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "scripted".to_string(),
            model: "test".to_string(),
        }
    }
}

/// Classifier that always answers with a preset match.
pub struct FixedClassifier {
    pub routes: Vec<Route>,
    pub answer: Mutex<RouteMatch>,
    pub queries: Mutex<Vec<String>>,
}

impl FixedClassifier {
    pub fn new(routes: Vec<Route>, answer: RouteMatch) -> Self {
        Self {
            routes,
            answer: Mutex::new(answer),
            queries: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RouteClassifier for FixedClassifier {
    async fn classify(&self, query: &str) -> Result<RouteMatch> {
        self.queries.lock().push(query.to_string());
        Ok(self.answer.lock().clone())
    }

    fn routes(&self) -> &[Route] {
        &self.routes
    }
}

pub fn model(chat: &Arc<ScriptedChat>) -> ChatModel {
    ChatModel::new(chat.clone(), GenerationConfig::default())
}

pub fn retriever(
    embedder: &Arc<KeywordEmbedder>,
    index: &Arc<StaticIndex>,
    top_k: usize,
) -> Retriever {
    Retriever::new(embedder.clone(), index.clone(), top_k)
}

pub fn catalogue() -> Vec<Passage> {
    vec![
        Passage::new("1", "SoundWave Elite 900 over-ear headphones. Price: $299.")
            .with_source("headphones1.txt"),
        Passage::new("2", "ClearSound X7 wireless headphones. Price: $149.")
            .with_source("headphones2.txt"),
        Passage::new("3", "TechMax UltraBook 14 laptop. Price: $1099.").with_source("laptop1.txt"),
    ]
}
