use std::sync::Arc;

use crate::config::{BotConfig, HistoryCommit, PipelineKind};
use crate::embeddings::{EmbeddingProvider, RemoteEmbeddingProvider};
use crate::error::Result;
use crate::llm::{ChatModel, ChatProvider, ExternalChatProvider, GenerationConfig};
use crate::rag::{ConversationalChain, MultiQueryRetriever, ProductChains, QueryRewriter};
use crate::routing::{default_routes, IntentRouter, RouteMatch, SemanticRouteLayer};
use crate::search::{AzureSearchIndex, Retriever, VectorSearch};

use super::{ChatPhase, ChatSession};

/// How a standalone question becomes an answer.
#[derive(Clone)]
pub enum Pipeline {
    /// Classify into a product route, answer with that route's chain.
    Routed {
        router: IntentRouter,
        chains: ProductChains,
    },
    /// One history-aware QA chain for everything.
    Conversational { chain: ConversationalChain },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input; nothing was recorded or called.
    Ignored,
    Answered {
        question: String,
        answer: String,
        /// Route taken, for the routed pipeline.
        route: Option<RouteMatch>,
    },
}

#[derive(Clone)]
pub struct ChatEngine {
    rewriter: QueryRewriter,
    pipeline: Pipeline,
    history_commit: HistoryCommit,
}

impl ChatEngine {
    pub fn new(rewriter: QueryRewriter, pipeline: Pipeline, history_commit: HistoryCommit) -> Self {
        Self {
            rewriter,
            pipeline,
            history_commit,
        }
    }

    /// Wire up the hosted services named in `config`. For the routed pipeline
    /// this encodes every route utterance up front.
    pub async fn from_config(config: &BotConfig) -> Result<Self> {
        let chat: Arc<dyn ChatProvider> = Arc::new(ExternalChatProvider::new(&config.chat)?);
        let model = ChatModel::new(chat, GenerationConfig::from(&config.chat));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(RemoteEmbeddingProvider::new(&config.embedding)?);
        let index: Arc<dyn VectorSearch> = Arc::new(AzureSearchIndex::new(&config.search)?);
        let retriever = Retriever::new(embedder.clone(), index, config.search.top_k);

        let pipeline = match config.pipeline {
            PipelineKind::Routed => {
                let layer =
                    SemanticRouteLayer::build(embedder, default_routes(), &config.routing).await?;
                let multi_query = MultiQueryRetriever::new(
                    model.clone(),
                    retriever,
                    config.retrieval.query_variants,
                );
                Pipeline::Routed {
                    router: IntentRouter::new(Arc::new(layer)),
                    chains: ProductChains::new(model.clone(), multi_query),
                }
            }
            PipelineKind::Conversational => Pipeline::Conversational {
                chain: ConversationalChain::new(
                    model.clone(),
                    retriever.with_top_k(config.retrieval.conversational_top_k),
                ),
            },
        };

        tracing::info!(
            pipeline = ?config.pipeline,
            model = %model.info().model,
            history_commit = ?config.history.commit,
            "Chat engine ready"
        );

        Ok(Self::new(QueryRewriter::new(model), pipeline, config.history.commit))
    }

    /// The intent router, when the engine runs the routed pipeline.
    pub fn router(&self) -> Option<&IntentRouter> {
        match &self.pipeline {
            Pipeline::Routed { router, .. } => Some(router),
            Pipeline::Conversational { .. } => None,
        }
    }

    /// Handle one user submission. On error the session is back in `Idle`
    /// and the transcript is untouched.
    pub async fn submit(&self, session: &mut ChatSession, input: &str) -> Result<SubmitOutcome> {
        if input.trim().is_empty() {
            return Ok(SubmitOutcome::Ignored);
        }

        let result = self.run(session, input).await;
        set_phase(session, ChatPhase::Idle);

        if let Err(e) = &result {
            tracing::error!(session = %session.id, error = %e, "Submission failed");
        }
        result
    }

    async fn run(&self, session: &mut ChatSession, input: &str) -> Result<SubmitOutcome> {
        let prior = session.history.as_messages();
        if self.history_commit == HistoryCommit::Eager {
            session.history.add_human(input);
        }

        set_phase(session, ChatPhase::Rewriting);
        let (answer, route) = match &self.pipeline {
            Pipeline::Routed { router, chains } => {
                let standalone = self.rewriter.rewrite(input, session.history.get()).await?;

                set_phase(session, ChatPhase::Routing);
                let route = router.route(&standalone).await?;

                set_phase(session, ChatPhase::Answering);
                let answer = chains.answer(&route, &standalone).await?;
                (answer, Some(route))
            }
            Pipeline::Conversational { chain } => {
                let standalone = self.rewriter.contextualize(input, &prior).await?;

                set_phase(session, ChatPhase::Answering);
                (chain.answer(input, &standalone, &prior).await?, None)
            }
        };

        if self.history_commit == HistoryCommit::OnSuccess {
            session.history.add_human(input);
        }
        session.history.add_ai(&answer);

        set_phase(session, ChatPhase::Displaying);
        session.record_exchange(input, &answer);

        Ok(SubmitOutcome::Answered {
            question: input.to_string(),
            answer,
            route,
        })
    }
}

fn set_phase(session: &mut ChatSession, phase: ChatPhase) {
    tracing::trace!(session = %session.id, from = ?session.phase, to = ?phase, "Phase change");
    session.phase = phase;
}
