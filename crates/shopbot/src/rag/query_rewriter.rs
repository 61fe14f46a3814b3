//! Query Rewriting Module
//!
//! Turns a follow-up question into a standalone one using the conversation
//! history and a single chat-completion call. The model output is returned
//! untouched; nothing checks that it is actually a question.

use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel};

use super::prompts::{CONTEXTUALIZE_SYSTEM_PROMPT, STANDALONE_QUESTION_PROMPT};

#[derive(Clone)]
pub struct QueryRewriter {
    model: ChatModel,
}

impl QueryRewriter {
    pub fn new(model: ChatModel) -> Self {
        Self { model }
    }

    /// Rewrite with the history flattened into the prompt, one entry per line.
    pub async fn rewrite(&self, question: &str, history: &[String]) -> Result<String> {
        let chat_history = history.join("\n");
        let prompt = STANDALONE_QUESTION_PROMPT
            .render(&[("question", question), ("chat_history", &chat_history)]);
        let rewritten = self.model.generate(&prompt).await?;
        tracing::debug!(
            original = %question,
            rewritten = %rewritten,
            history = history.len(),
            "Standalone question"
        );
        Ok(rewritten)
    }

    /// Rewrite with the history passed as chat messages. Without history the
    /// question is already standalone and no call is made.
    pub async fn contextualize(&self, question: &str, history: &[ChatMessage]) -> Result<String> {
        if history.is_empty() {
            return Ok(question.to_string());
        }
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(CONTEXTUALIZE_SYSTEM_PROMPT.text));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(question));
        self.model.chat(&messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatRole;
    use crate::test_support::{model, ScriptedChat};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_rewrite_embeds_question_and_history() {
        let chat = Arc::new(ScriptedChat::constant("How much is the SwiftBook Pro 13?"));
        let rewriter = QueryRewriter::new(model(&chat));
        let history = vec![
            "Human: Tell me about the SwiftBook Pro 13".to_string(),
            "AI: It is a 13 inch laptop (laptop2).".to_string(),
            "Human: how much is it?".to_string(),
        ];

        let rewritten = rewriter.rewrite("how much is it?", &history).await.unwrap();
        assert_eq!(rewritten, "How much is the SwiftBook Pro 13?");

        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Original Question: how much is it?"));
        assert!(prompts[0].contains(
            "Chat History: Human: Tell me about the SwiftBook Pro 13\nAI: It is a 13 inch laptop (laptop2).\nHuman: how much is it?"
        ));
        assert!(prompts[0].starts_with("Given a chat history"));
    }

    #[tokio::test]
    async fn test_rewrite_returns_model_text_verbatim() {
        let chat = Arc::new(ScriptedChat::constant(
            "  Sure! Here is the question:\nWhat laptops?  ",
        ));
        let rewriter = QueryRewriter::new(model(&chat));
        let rewritten = rewriter.rewrite("laptops?", &[]).await.unwrap();
        assert_eq!(rewritten, "  Sure! Here is the question:\nWhat laptops?  ");
    }

    #[tokio::test]
    async fn test_rewrite_propagates_service_errors() {
        let chat = Arc::new(ScriptedChat::failing());
        let rewriter = QueryRewriter::new(model(&chat));
        assert!(rewriter.rewrite("laptops?", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_contextualize_without_history_skips_model() {
        let chat = Arc::new(ScriptedChat::constant("unused"));
        let rewriter = QueryRewriter::new(model(&chat));
        let q = rewriter.contextualize("What smartwatches do you offer?", &[]).await.unwrap();
        assert_eq!(q, "What smartwatches do you offer?");
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn test_contextualize_sends_history_as_messages() {
        let chat = Arc::new(ScriptedChat::constant("What does the FitGear 6X cost?"));
        let rewriter = QueryRewriter::new(model(&chat));
        let history = vec![
            ChatMessage::user("Tell me about the FitGear 6X"),
            ChatMessage::assistant("A fitness smartwatch (smartwatch1)."),
        ];

        let q = rewriter.contextualize("what does it cost?", &history).await.unwrap();
        assert_eq!(q, "What does the FitGear 6X cost?");

        let requests = chat.requests.lock();
        let sent = &requests[0];
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, ChatRole::System);
        assert_eq!(sent[1], history[0]);
        assert_eq!(sent[3], ChatMessage::user("what does it cost?"));
    }
}
