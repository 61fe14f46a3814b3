//! Multi-query retrieval
//!
//! Asks the model for alternative phrasings of a question, searches the
//! index with each, and merges the hits. Phrasings that differ in wording
//! land on different neighbours, which raises recall over a single search.

use std::collections::HashSet;

use crate::error::Result;
use crate::llm::ChatModel;
use crate::search::Retriever;
use crate::types::Passage;

use super::prompts::MULTI_QUERY_PROMPT;

#[derive(Clone)]
pub struct MultiQueryRetriever {
    model: ChatModel,
    retriever: Retriever,
    variants: usize,
}

impl MultiQueryRetriever {
    pub fn new(model: ChatModel, retriever: Retriever, variants: usize) -> Self {
        Self {
            model,
            retriever,
            variants: variants.max(1),
        }
    }

    /// Alternative phrasings of `question`, one per non-empty output line.
    pub async fn generate_queries(&self, question: &str) -> Result<Vec<String>> {
        let count = self.variants.to_string();
        let prompt = MULTI_QUERY_PROMPT.render(&[("count", &count), ("question", question)]);
        let raw = self.model.generate(&prompt).await?;
        let queries = parse_query_lines(&raw);
        tracing::debug!(question = %question, queries = ?queries, "Generated query variants");
        Ok(queries)
    }

    /// Search with every variant and merge. Falls back to the question
    /// itself when the model produced no usable line.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<Passage>> {
        let mut queries = self.generate_queries(question).await?;
        if queries.is_empty() {
            tracing::warn!(
                question = %question,
                "No query variants produced, searching the question as-is"
            );
            queries.push(question.to_string());
        }

        let mut result_sets = Vec::with_capacity(queries.len());
        for query in &queries {
            result_sets.push(self.retriever.retrieve(query).await?);
        }

        let merged = merge_unique(result_sets);
        tracing::info!(
            queries = queries.len(),
            passages = merged.len(),
            "Multi-query retrieval complete"
        );
        Ok(merged)
    }
}

/// One query per non-blank output line. Line text is kept as written, so
/// leading digits or signs that belong to the query survive.
fn parse_query_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Union of the result sets in query order; the same chunk returned twice is
/// kept at its first position.
fn merge_unique(result_sets: Vec<Vec<Passage>>) -> Vec<Passage> {
    let mut seen = HashSet::new();
    result_sets
        .into_iter()
        .flatten()
        .filter(|passage| seen.insert(passage.dedup_key()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        catalogue, model, retriever, KeywordEmbedder, ScriptedChat, StaticIndex,
    };
    use std::sync::Arc;

    #[test]
    fn test_parse_query_lines_keeps_line_text() {
        let raw = "\n3.5mm jack on the SoundWave Elite 900?\n\n-10% deals on laptops\n  Price of the FitGear 6X  \n";
        assert_eq!(
            parse_query_lines(raw),
            [
                "3.5mm jack on the SoundWave Elite 900?",
                "-10% deals on laptops",
                "Price of the FitGear 6X"
            ]
        );
        assert!(parse_query_lines("  \n\n").is_empty());
    }

    #[test]
    fn test_parse_query_lines_keeps_every_line() {
        let raw = "one\ntwo\nthree\nfour";
        assert_eq!(parse_query_lines(raw).len(), 4);
    }

    #[test]
    fn test_merge_unique_keeps_query_order() {
        let a = Passage::new("a", "alpha").with_source("laptop1.txt");
        let b = Passage::new("b", "beta").with_source("laptop2.txt");
        let c = Passage::new("c", "gamma").with_source("laptop3.txt");
        let d = Passage::new("d", "delta").with_source("laptop4.txt");
        let merged = merge_unique(vec![
            vec![a.clone(), b.clone()],
            vec![a.clone(), c.clone(), d.clone()],
            vec![b.clone()],
        ]);
        let ids: Vec<&str> = merged.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_merge_keeps_same_text_from_different_sources() {
        let merged = merge_unique(vec![
            vec![Passage::new("1", "Price: $299").with_source("headphones1.txt")],
            vec![Passage::new("2", "Price: $299").with_source("smartwatch1.txt")],
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_searches_every_variant() {
        let chat = Arc::new(ScriptedChat::constant(
            "headphones price\nheadphones cost\nheadphones deals",
        ));
        let embedder = Arc::new(KeywordEmbedder::default());
        let index = Arc::new(StaticIndex::new(catalogue()));
        let mq = MultiQueryRetriever::new(model(&chat), retriever(&embedder, &index, 2), 3);

        let passages = mq.retrieve("How much are the headphones?").await.unwrap();

        assert_eq!(index.calls(), 3);
        assert_eq!(
            *embedder.texts.lock(),
            ["headphones price", "headphones cost", "headphones deals"]
        );
        assert_eq!(passages.len(), 2);
        assert!(chat.prompts()[0].contains("Original question: How much are the headphones?"));
        assert!(chat.prompts()[0].contains("generate 3 different versions"));
    }

    #[tokio::test]
    async fn test_retrieve_embeds_variants_verbatim() {
        let chat = Arc::new(ScriptedChat::constant(
            "3.5mm jack on the SoundWave Elite 900?\n-10% deals on laptops",
        ));
        let embedder = Arc::new(KeywordEmbedder::default());
        let index = Arc::new(StaticIndex::new(catalogue()));
        let mq = MultiQueryRetriever::new(model(&chat), retriever(&embedder, &index, 4), 3);

        mq.retrieve("headphone jack size?").await.unwrap();
        assert_eq!(
            *embedder.texts.lock(),
            ["3.5mm jack on the SoundWave Elite 900?", "-10% deals on laptops"]
        );
    }

    #[tokio::test]
    async fn test_retrieve_falls_back_to_question() {
        let chat = Arc::new(ScriptedChat::constant("\n  \n"));
        let embedder = Arc::new(KeywordEmbedder::default());
        let index = Arc::new(StaticIndex::new(catalogue()));
        let mq = MultiQueryRetriever::new(model(&chat), retriever(&embedder, &index, 4), 3);

        let passages = mq.retrieve("laptops?").await.unwrap();
        assert_eq!(index.calls(), 1);
        assert_eq!(*embedder.texts.lock(), ["laptops?"]);
        assert_eq!(passages.len(), 3);
    }
}
