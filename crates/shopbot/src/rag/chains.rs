//! Per-intent answer chains.
//!
//! Product intents retrieve passages with multi-query expansion and answer
//! from the category template; small talk answers from its own prompt with no
//! retrieval. Anything the router could not place gets a fixed reply.

use crate::error::Result;
use crate::llm::ChatModel;
use crate::routing::{Intent, RouteMatch};

use super::multi_query::MultiQueryRetriever;
use super::prompts::{
    format_passages, PromptTemplate, HEADPHONES_PROMPT, HOME_THEATER_PROMPT, LAPTOP_PROMPT,
    SMALL_TALK_PROMPT, SMARTPHONE_PROMPT, SMARTWATCH_PROMPT,
};

/// Reply for queries no route claims. Produced without any service call.
pub const FALLBACK_ANSWER: &str = "Sorry, I cannot help you with that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// Retrieve, then fill `{context}` and `{question}`.
    Retrieval(&'static PromptTemplate),
    /// Fill `{input}` only.
    SmallTalk(&'static PromptTemplate),
}

pub fn chain_for(intent: Intent) -> ChainKind {
    match intent {
        Intent::SmallTalk => ChainKind::SmallTalk(&SMALL_TALK_PROMPT),
        Intent::Headphones => ChainKind::Retrieval(&HEADPHONES_PROMPT),
        Intent::Laptop => ChainKind::Retrieval(&LAPTOP_PROMPT),
        Intent::Smartphone => ChainKind::Retrieval(&SMARTPHONE_PROMPT),
        Intent::Smartwatch => ChainKind::Retrieval(&SMARTWATCH_PROMPT),
        Intent::HomeTheater => ChainKind::Retrieval(&HOME_THEATER_PROMPT),
    }
}

#[derive(Clone)]
pub struct ProductChains {
    model: ChatModel,
    retriever: MultiQueryRetriever,
}

impl ProductChains {
    pub fn new(model: ChatModel, retriever: MultiQueryRetriever) -> Self {
        Self { model, retriever }
    }

    /// Answer `query` with the chain the route selects, or the fallback.
    pub async fn answer(&self, route: &RouteMatch, query: &str) -> Result<String> {
        match route.intent() {
            Some(intent) => self.answer_intent(intent, query).await,
            None => {
                tracing::info!(route = ?route.name, "No chain for route, using fallback");
                Ok(FALLBACK_ANSWER.to_string())
            }
        }
    }

    pub async fn answer_intent(&self, intent: Intent, query: &str) -> Result<String> {
        match chain_for(intent) {
            ChainKind::SmallTalk(template) => {
                let prompt = template.render(&[("input", query)]);
                self.model.generate(&prompt).await
            }
            ChainKind::Retrieval(template) => {
                let passages = self.retriever.retrieve(query).await?;
                let context = format_passages(&passages);
                tracing::debug!(
                    chain = template.name,
                    passages = passages.len(),
                    context_chars = context.len(),
                    "Answering from retrieved context"
                );
                let prompt = template.render(&[("context", &context), ("question", query)]);
                self.model.generate(&prompt).await
            }
        }
    }
}
