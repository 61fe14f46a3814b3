//! Semantic route layer
//!
//! Every route utterance is embedded once when the layer is built. A query is
//! embedded, scored against all utterances by cosine similarity, and the
//! `top_k` nearest utterances vote for their routes (scores summed per
//! route). The winning route is accepted only if its single best utterance
//! reaches the score threshold.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{Route, RouteClassifier, RouteMatch};
use crate::config::RoutingConfig;
use crate::embeddings::{cosine_similarity, EmbeddingProvider};
use crate::error::{BotError, Result};

struct EncodedUtterance {
    route: usize,
    vector: Vec<f32>,
}

pub struct SemanticRouteLayer {
    encoder: Arc<dyn EmbeddingProvider>,
    routes: Vec<Route>,
    utterances: Vec<EncodedUtterance>,
    score_threshold: f32,
    top_k: usize,
}

impl SemanticRouteLayer {
    /// Encode all utterances with one batch call.
    pub async fn build(
        encoder: Arc<dyn EmbeddingProvider>,
        routes: Vec<Route>,
        config: &RoutingConfig,
    ) -> Result<Self> {
        let (owners, texts): (Vec<usize>, Vec<String>) = routes
            .iter()
            .enumerate()
            .flat_map(|(i, r)| r.utterances.iter().map(move |u| (i, u.clone())))
            .unzip();

        let vectors = encoder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(BotError::Decode {
                service: "embedding",
                message: format!(
                    "encoded {} of {} route utterances",
                    vectors.len(),
                    texts.len()
                ),
            });
        }

        let expected = encoder.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(BotError::Decode {
                service: "embedding",
                message: format!(
                    "{} returned {}-dimensional vectors, expected {}",
                    encoder.model_name(),
                    bad.len(),
                    expected
                ),
            });
        }

        let utterances = owners
            .into_iter()
            .zip(vectors)
            .map(|(route, vector)| EncodedUtterance { route, vector })
            .collect::<Vec<_>>();

        tracing::info!(
            routes = routes.len(),
            utterances = utterances.len(),
            encoder = encoder.model_name(),
            threshold = config.score_threshold,
            "Semantic route layer ready"
        );

        Ok(Self {
            encoder,
            routes,
            utterances,
            score_threshold: config.score_threshold,
            top_k: config.top_k.max(1),
        })
    }

    /// Pick a route for an already-embedded query. The winner's best score
    /// must exceed the threshold; a score equal to it is not a match.
    fn classify_vector(&self, query_vector: &[f32]) -> RouteMatch {
        let mut scored: Vec<(usize, f32)> = self
            .utterances
            .iter()
            .map(|u| (u.route, cosine_similarity(query_vector, &u.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.top_k);

        // route -> (summed score, best single score)
        let mut votes: HashMap<usize, (f32, f32)> = HashMap::new();
        for (route, score) in scored {
            let entry = votes.entry(route).or_insert((0.0, f32::MIN));
            entry.0 += score;
            entry.1 = entry.1.max(score);
        }

        // Ties go to the route configured first.
        let winner = votes
            .into_iter()
            .max_by(|(ra, a), (rb, b)| a.0.total_cmp(&b.0).then_with(|| rb.cmp(ra)));

        match winner {
            Some((route, (_, best))) if best > self.score_threshold => RouteMatch {
                name: Some(self.routes[route].name.clone()),
                score: Some(best),
            },
            Some((route, (_, best))) => {
                tracing::debug!(
                    candidate = %self.routes[route].name,
                    best_score = best,
                    threshold = self.score_threshold,
                    "No route cleared the threshold"
                );
                RouteMatch::none()
            }
            None => RouteMatch::none(),
        }
    }
}

#[async_trait]
impl RouteClassifier for SemanticRouteLayer {
    async fn classify(&self, query: &str) -> Result<RouteMatch> {
        if self.utterances.is_empty() {
            return Ok(RouteMatch::none());
        }
        let vector = self.encoder.embed(query).await?;
        Ok(self.classify_vector(&vector))
    }

    fn routes(&self) -> &[Route] {
        &self.routes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::default_routes;
    use crate::test_support::KeywordEmbedder;

    async fn layer(threshold: f32) -> (SemanticRouteLayer, Arc<KeywordEmbedder>) {
        let encoder = Arc::new(KeywordEmbedder::default());
        let config = RoutingConfig {
            score_threshold: threshold,
            top_k: 5,
        };
        let layer = SemanticRouteLayer::build(encoder.clone(), default_routes(), &config)
            .await
            .unwrap();
        (layer, encoder)
    }

    #[tokio::test]
    async fn test_build_encodes_every_utterance_once() {
        let (_layer, encoder) = layer(0.82).await;
        assert_eq!(encoder.calls(), 18);
    }

    #[tokio::test]
    async fn test_classifies_product_question() {
        let (layer, _) = layer(0.82).await;
        let matched = layer.classify("Do you sell headphones?").await.unwrap();
        assert_eq!(matched.name.as_deref(), Some("headphones_questions"));
        assert!(matched.score.unwrap() > 0.82);

        let matched = layer.classify("which laptop is lightest").await.unwrap();
        assert_eq!(matched.name.as_deref(), Some("laptop_questions"));
    }

    #[tokio::test]
    async fn test_classifies_small_talk_by_summed_votes() {
        let (layer, _) = layer(0.82).await;
        let matched = layer.classify("hey, how is it going").await.unwrap();
        assert_eq!(matched.name.as_deref(), Some("small_talk"));
    }

    #[tokio::test]
    async fn test_unrelated_query_has_no_match() {
        let (layer, _) = layer(0.82).await;
        let matched = layer.classify("Who won the football final?").await.unwrap();
        assert_eq!(matched, RouteMatch::none());
    }

    #[tokio::test]
    async fn test_threshold_gates_best_single_score() {
        // Closest utterance is "How's it going?" at cosine ~0.816.
        let query = "how is the weather going";

        let (strict, _) = layer(0.95).await;
        assert!(strict.classify(query).await.unwrap().name.is_none());

        let (lenient, _) = layer(0.8).await;
        let matched = lenient.classify(query).await.unwrap();
        assert_eq!(matched.name.as_deref(), Some("small_talk"));
        assert!((matched.score.unwrap() - 0.816).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_score_equal_to_threshold_is_not_a_match() {
        // Identical keyword vector to "What headphones do you offer?": cosine 1.0.
        let query = "headphones?";

        let (exact, _) = layer(1.0).await;
        assert!(exact.classify(query).await.unwrap().name.is_none());

        let (below, _) = layer(0.99).await;
        let matched = below.classify(query).await.unwrap();
        assert_eq!(matched.name.as_deref(), Some("headphones_questions"));
        assert_eq!(matched.score, Some(1.0));
    }

    struct MisreportedEmbedder(KeywordEmbedder);

    #[async_trait]
    impl EmbeddingProvider for MisreportedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.0.embed(text).await
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.0.embed_batch(texts).await
        }

        fn dimensions(&self) -> usize {
            1536
        }

        fn model_name(&self) -> &str {
            "misreported"
        }
    }

    #[tokio::test]
    async fn test_build_rejects_unexpected_dimensions() {
        let encoder = Arc::new(MisreportedEmbedder(KeywordEmbedder::default()));
        let result =
            SemanticRouteLayer::build(encoder, default_routes(), &RoutingConfig::default()).await;
        assert!(matches!(result, Err(BotError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_empty_route_set_never_calls_encoder_for_queries() {
        let encoder = Arc::new(KeywordEmbedder::default());
        let layer =
            SemanticRouteLayer::build(encoder.clone(), Vec::new(), &RoutingConfig::default())
                .await
                .unwrap();
        assert!(layer.classify("laptops?").await.unwrap().name.is_none());
        assert_eq!(encoder.calls(), 0);
    }
}
