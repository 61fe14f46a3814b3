//! LLM Module - hosted chat-completion models
//! Azure OpenAI deployments plus OpenAI-compatible hosts behind one trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::ChatModelConfig;
use crate::error::Result;

pub mod external;

pub use external::ExternalChatProvider;

/// Hosted API flavours. Embeddings reuse the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiProvider {
    /// Azure OpenAI: per-deployment URLs, `api-key` header, `api-version` query.
    AzureOpenAi,
    OpenAi,
    Ollama,
    /// Any OpenAI-compatible endpoint; `endpoint` is the full request URL.
    Custom,
}

impl ApiProvider {
    pub fn name(self) -> &'static str {
        match self {
            Self::AzureOpenAi => "Azure OpenAI",
            Self::OpenAi => "OpenAI",
            Self::Ollama => "Ollama",
            Self::Custom => "Custom",
        }
    }

    pub fn requires_endpoint(self) -> bool {
        matches!(self, Self::AzureOpenAi | Self::Custom)
    }

    pub fn requires_api_key(self) -> bool {
        matches!(self, Self::AzureOpenAi | Self::OpenAi)
    }

    fn default_base(self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434/v1",
            _ => "https://api.openai.com/v1",
        }
    }

    /// Request URL for an operation (`chat/completions`, `embeddings`).
    pub(crate) fn operation_url(
        self,
        endpoint: &str,
        deployment: &str,
        api_version: &str,
        operation: &str,
    ) -> String {
        let endpoint = endpoint.trim().trim_end_matches('/');
        match self {
            Self::AzureOpenAi => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                endpoint, deployment, operation, api_version
            ),
            Self::OpenAi | Self::Ollama => {
                let base = if endpoint.is_empty() {
                    self.default_base()
                } else {
                    endpoint
                };
                format!("{}/{}", base, operation)
            }
            Self::Custom => endpoint.to_string(),
        }
    }

    /// Authentication header for the provider, if any.
    pub(crate) fn auth_header(self, api_key: &str) -> Option<(&'static str, String)> {
        match self {
            Self::AzureOpenAi => Some(("api-key", api_key.to_string())),
            _ if api_key.is_empty() => None,
            _ => Some(("Authorization", format!("Bearer {}", api_key))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_tokens: usize,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
        }
    }
}

impl From<&ChatModelConfig> for GenerationConfig {
    fn from(config: &ChatModelConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}

/// Core trait for chat-completion services
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Complete a conversation, returning the assistant text verbatim.
    async fn complete(&self, messages: &[ChatMessage], config: &GenerationConfig)
        -> Result<String>;

    fn info(&self) -> ProviderInfo;
}

/// A provider bound to its generation settings. Cheap to clone.
#[derive(Clone)]
pub struct ChatModel {
    provider: Arc<dyn ChatProvider>,
    config: GenerationConfig,
}

impl ChatModel {
    pub fn new(provider: Arc<dyn ChatProvider>, config: GenerationConfig) -> Self {
        Self { provider, config }
    }

    /// Send a rendered prompt as a single user message.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        tracing::debug!(
            messages = messages.len(),
            chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "Chat completion request"
        );
        self.provider.complete(messages, &self.config).await
    }

    pub fn info(&self) -> ProviderInfo {
        self.provider.info()
    }
}
