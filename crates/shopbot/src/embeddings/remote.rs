//! Hosted embedding client (Azure OpenAI deployments, OpenAI-compatible
//! `/embeddings` endpoints).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::{BotError, Result};
use crate::http;
use crate::llm::ApiProvider;

const SERVICE: &str = "embedding";

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

pub struct RemoteEmbeddingProvider {
    client: Client,
    provider: ApiProvider,
    url: String,
    api_key: String,
    model: String,
    dims: usize,
}

impl RemoteEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        if config.provider.requires_endpoint() && config.endpoint.trim().is_empty() {
            return Err(BotError::Config(format!(
                "{} embedding endpoint is not set",
                config.provider.name()
            )));
        }
        let deployment = if config.deployment.is_empty() {
            &config.model
        } else {
            &config.deployment
        };
        let url = config.provider.operation_url(
            &config.endpoint,
            deployment,
            &config.api_version,
            "embeddings",
        );
        tracing::info!(
            provider = config.provider.name(),
            model = %config.model,
            dims = config.dimensions,
            "Creating RemoteEmbeddingProvider"
        );
        Ok(Self {
            client: http::build_client()?,
            provider: config.provider,
            url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dims: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or(BotError::EmptyResponse(SERVICE))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: (self.provider != ApiProvider::AzureOpenAi).then_some(self.model.as_str()),
            input: texts,
        };
        let response: EmbeddingResponse = http::post_json(
            &self.client,
            &self.url,
            self.provider.auth_header(&self.api_key),
            &request,
            SERVICE,
        )
        .await?;

        let vectors = into_ordered_vectors(response);
        if vectors.len() != texts.len() {
            return Err(BotError::Decode {
                service: SERVICE,
                message: format!("expected {} embeddings, got {}", texts.len(), vectors.len()),
            });
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Services may return items out of order; `index` restores input order.
fn into_ordered_vectors(response: EmbeddingResponse) -> Vec<Vec<f32>> {
    let mut data = response.data;
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    data.into_iter().map(|d| d.embedding).collect()
}
