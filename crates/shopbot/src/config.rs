use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::llm::ApiProvider;

const REDACTED: &str = "***";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub pipeline: PipelineKind,
    pub chat: ChatModelConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub routing: RoutingConfig,
    pub retrieval: RetrievalConfig,
    pub history: HistoryConfig,
}

/// Which answer pipeline a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Rewrite, classify into a product route, answer with that route's chain.
    #[default]
    Routed,
    /// Rewrite, retrieve, answer with one generic QA prompt and the chat history.
    Conversational,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatModelConfig {
    pub provider: ApiProvider,
    /// Resource base URL for Azure, API base for OpenAI-compatible hosts,
    /// or the full completion URL for custom providers.
    pub endpoint: String,
    pub api_key: String,
    /// Deployment name on Azure, model name everywhere else.
    pub deployment: String,
    pub api_version: String,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: ApiProvider,
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub model: String,
    pub api_version: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub api_version: String,
    pub vector_field: String,
    pub content_field: String,
    pub metadata_field: String,
    /// Passages returned per vector query.
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum cosine similarity the winning route's best utterance must reach.
    pub score_threshold: f32,
    /// Number of nearest utterances that vote on the route.
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Alternative phrasings requested from the model for multi-query retrieval.
    pub query_variants: usize,
    /// Passages retrieved by the conversational pipeline.
    pub conversational_top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub commit: HistoryCommit,
}

/// When the user's entry lands in the rewrite history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistoryCommit {
    /// Append `Human:` before dispatch. A failed turn leaves it without a reply.
    #[default]
    Eager,
    /// Append `Human:` and `AI:` together once the answer is in hand.
    OnSuccess,
}

impl BotConfig {
    /// Validate config values, returning errors for clearly broken configurations.
    pub fn validate(&self) -> Result<(), String> {
        validate_service("chat", self.chat.provider, &self.chat.endpoint, &self.chat.api_key)?;
        validate_service(
            "embedding",
            self.embedding.provider,
            &self.embedding.endpoint,
            &self.embedding.api_key,
        )?;
        if self.chat.deployment.trim().is_empty() {
            return Err("chat.deployment must be set".into());
        }
        if self.embedding.deployment.trim().is_empty() && self.embedding.model.trim().is_empty() {
            return Err("embedding.deployment or embedding.model must be set".into());
        }
        if self.embedding.dimensions == 0 {
            return Err("embedding.dimensions must be > 0".into());
        }
        if self.search.endpoint.trim().is_empty() {
            return Err("search.endpoint must be set (AZURE_SEARCH_ENDPOINT)".into());
        }
        if self.search.api_key.trim().is_empty() {
            return Err("search.api_key must be set (AZURE_SEARCH_KEY)".into());
        }
        if self.search.index_name.trim().is_empty() {
            return Err("search.index_name must be set".into());
        }
        if self.search.top_k == 0 {
            return Err("search.top_k must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.routing.score_threshold) {
            return Err("routing.score_threshold must be in [0.0, 1.0]".into());
        }
        if self.routing.top_k == 0 {
            return Err("routing.top_k must be > 0".into());
        }
        if self.retrieval.query_variants == 0 {
            return Err("retrieval.query_variants must be > 0".into());
        }
        if self.retrieval.conversational_top_k == 0 {
            return Err("retrieval.conversational_top_k must be > 0".into());
        }
        if self.history.capacity == 0 {
            return Err("history.capacity must be > 0".into());
        }
        Ok(())
    }

    /// Load config from a JSON file, falling back to defaults for missing fields.
    ///
    /// Not validated: secrets usually arrive later from the environment.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Defaults, then the JSON file (explicit path, else the per-user one if it
    /// exists), then the process environment. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::info!(path = %path.display(), "Loading user config");
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup.
    ///
    /// `AZURE_OPENAI_*` feed both the chat and the embedding service, the
    /// `AZURE_SEARCH_*` pair feeds the index, and `SHOPBOT_*` override single
    /// knobs.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get("AZURE_OPENAI_ENDPOINT") {
            self.chat.endpoint = endpoint.clone();
            self.embedding.endpoint = endpoint;
        }
        if let Some(key) = get("AZURE_OPENAI_API_KEY") {
            self.chat.api_key = key.clone();
            self.embedding.api_key = key;
        }
        if let Some(endpoint) = get("AZURE_SEARCH_ENDPOINT") {
            self.search.endpoint = endpoint;
        }
        if let Some(key) = get("AZURE_SEARCH_KEY") {
            self.search.api_key = key;
        }
        if let Some(deployment) = get("SHOPBOT_CHAT_DEPLOYMENT") {
            self.chat.deployment = deployment;
        }
        if let Some(deployment) = get("SHOPBOT_EMBEDDING_DEPLOYMENT") {
            self.embedding.deployment = deployment;
        }
        if let Some(index) = get("SHOPBOT_SEARCH_INDEX") {
            self.search.index_name = index;
        }
        if let Some(pipeline) = get("SHOPBOT_PIPELINE") {
            match pipeline.trim().to_lowercase().as_str() {
                "routed" => self.pipeline = PipelineKind::Routed,
                "conversational" => self.pipeline = PipelineKind::Conversational,
                other => tracing::warn!(value = %other, "Ignoring unknown SHOPBOT_PIPELINE"),
            }
        }
        if let Some(threshold) = get("SHOPBOT_ROUTE_THRESHOLD") {
            match threshold.trim().parse::<f32>() {
                Ok(value) => self.routing.score_threshold = value,
                Err(e) => tracing::warn!(
                    value = %threshold,
                    error = %e,
                    "Ignoring unparsable SHOPBOT_ROUTE_THRESHOLD"
                ),
            }
        }
    }

    /// Copy with every secret replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for key in [
            &mut copy.chat.api_key,
            &mut copy.embedding.api_key,
            &mut copy.search.api_key,
        ] {
            if !key.is_empty() {
                *key = REDACTED.to_string();
            }
        }
        copy
    }
}

fn validate_service(
    name: &str,
    provider: ApiProvider,
    endpoint: &str,
    api_key: &str,
) -> Result<(), String> {
    if provider.requires_endpoint() && endpoint.trim().is_empty() {
        return Err(format!("{}.endpoint must be set for {:?}", name, provider));
    }
    if provider.requires_api_key() && api_key.trim().is_empty() {
        return Err(format!("{}.api_key must be set for {:?}", name, provider));
    }
    Ok(())
}

/// `<config dir>/shopbot/config.json`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shopbot").join("config.json"))
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineKind::Routed,
            chat: ChatModelConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            routing: RoutingConfig::default(),
            retrieval: RetrievalConfig::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for ChatModelConfig {
    fn default() -> Self {
        Self {
            provider: ApiProvider::AzureOpenAi,
            endpoint: String::new(),
            api_key: String::new(),
            deployment: "gpt4o".to_string(),
            api_version: "2024-02-01".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ApiProvider::AzureOpenAi,
            endpoint: String::new(),
            api_key: String::new(),
            deployment: "embeddings".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_version: "2024-02-01".to_string(),
            dimensions: 1536,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index_name: "products-optimized".to_string(),
            api_version: "2023-11-01".to_string(),
            vector_field: "content_vector".to_string(),
            content_field: "content".to_string(),
            metadata_field: "metadata".to_string(),
            top_k: 4,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.82,
            top_k: 5,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            query_variants: 3,
            conversational_top_k: 5,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: crate::rag::history::DEFAULT_HISTORY_CAPACITY,
            commit: HistoryCommit::Eager,
        }
    }
}
