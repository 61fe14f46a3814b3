//! History-aware QA without routing: one generic prompt for every question.

use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel};
use crate::search::Retriever;

use super::prompts::{format_passages, QA_SYSTEM_PROMPT};

#[derive(Clone)]
pub struct ConversationalChain {
    model: ChatModel,
    retriever: Retriever,
}

impl ConversationalChain {
    pub fn new(model: ChatModel, retriever: Retriever) -> Self {
        Self { model, retriever }
    }

    /// Retrieve with `standalone` and answer `question` with the history
    /// replayed as chat messages.
    pub async fn answer(
        &self,
        question: &str,
        standalone: &str,
        history: &[ChatMessage],
    ) -> Result<String> {
        let passages = self.retriever.retrieve(standalone).await?;
        let context = format_passages(&passages);
        tracing::debug!(
            passages = passages.len(),
            history = history.len(),
            "Answering conversational question"
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(QA_SYSTEM_PROMPT.render(&[("context", &context)])));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(question));
        self.model.chat(&messages).await
    }
}
