//! Chat-completion client for Azure OpenAI deployments and
//! OpenAI-compatible hosts.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{ApiProvider, ChatMessage, ChatProvider, GenerationConfig, ProviderInfo};
use crate::config::ChatModelConfig;
use crate::error::{BotError, Result};
use crate::http;

const SERVICE: &str = "chat completion";

pub struct ExternalChatProvider {
    provider: ApiProvider,
    endpoint: String,
    api_key: String,
    deployment: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ExternalChatProvider {
    pub fn new(config: &ChatModelConfig) -> Result<Self> {
        if config.provider.requires_endpoint() && config.endpoint.trim().is_empty() {
            return Err(BotError::Config(format!(
                "{} chat endpoint is not set",
                config.provider.name()
            )));
        }
        let endpoint = config.provider.operation_url(
            &config.endpoint,
            &config.deployment,
            &config.api_version,
            "chat/completions",
        );

        tracing::info!(
            provider = config.provider.name(),
            deployment = %config.deployment,
            "Creating ExternalChatProvider"
        );

        Ok(Self {
            provider: config.provider,
            endpoint,
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
            client: http::build_client()?,
        })
    }

    fn request_body(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
    ) -> serde_json::Value {
        let mut body = json!({
            "messages": messages,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "stream": false
        });
        // Azure picks the model from the deployment in the URL.
        if self.provider != ApiProvider::AzureOpenAi {
            body["model"] = json!(self.deployment);
        }
        body
    }
}

#[async_trait]
impl ChatProvider for ExternalChatProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<String> {
        let body = self.request_body(messages, config);
        let response: CompletionResponse = http::post_json(
            &self.client,
            &self.endpoint,
            self.provider.auth_header(&self.api_key),
            &body,
            SERVICE,
        )
        .await?;

        let content = first_content(response)?;
        tracing::debug!("Completion received, {} chars", content.len());
        Ok(content)
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.provider.name().to_string(),
            model: self.deployment.clone(),
        }
    }
}

fn first_content(response: CompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or(BotError::EmptyResponse(SERVICE))
}
