//! Azure AI Search vector queries over the REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::VectorSearch;
use crate::config::SearchConfig;
use crate::error::{BotError, Result};
use crate::http;
use crate::types::Passage;

const SERVICE: &str = "vector search";

pub struct AzureSearchIndex {
    client: Client,
    url: String,
    api_key: String,
    vector_field: String,
    content_field: String,
    metadata_field: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Map<String, Value>>,
}

impl AzureSearchIndex {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(BotError::Config("search endpoint is not set".into()));
        }
        let url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            config.endpoint.trim().trim_end_matches('/'),
            config.index_name,
            config.api_version
        );
        tracing::info!(index = %config.index_name, "Creating AzureSearchIndex");
        Ok(Self {
            client: http::build_client()?,
            url,
            api_key: config.api_key.clone(),
            vector_field: config.vector_field.clone(),
            content_field: config.content_field.clone(),
            metadata_field: config.metadata_field.clone(),
        })
    }

    fn request_body(&self, query_vector: &[f32], top_k: usize) -> Value {
        json!({
            "top": top_k,
            "select": format!("id,{},{}", self.content_field, self.metadata_field),
            "vectorQueries": [{
                "kind": "vector",
                "vector": query_vector,
                "k": top_k,
                "fields": self.vector_field,
            }]
        })
    }

    fn to_passage(&self, mut doc: Map<String, Value>) -> Passage {
        let id = match doc.remove("id") {
            Some(Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let score = doc
            .get("@search.score")
            .and_then(Value::as_f64)
            .unwrap_or_default() as f32;
        let content = match doc.remove(&self.content_field) {
            Some(Value::String(text)) => text,
            _ => String::new(),
        };
        let metadata = doc
            .remove(&self.metadata_field)
            .map(parse_metadata)
            .unwrap_or_default();

        Passage {
            id,
            score,
            content,
            metadata,
        }
    }
}

/// Metadata is stored either as a JSON-encoded string or as an object.
/// Non-string values are kept in their JSON form.
fn parse_metadata(raw: Value) -> HashMap<String, String> {
    let object = match raw {
        Value::Object(map) => map,
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            _ => return HashMap::new(),
        },
        _ => return HashMap::new(),
    };
    object
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect()
}

#[async_trait]
impl VectorSearch for AzureSearchIndex {
    async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Passage>> {
        let body = self.request_body(query_vector, top_k);
        let response: SearchResponse = http::post_json(
            &self.client,
            &self.url,
            Some(("api-key", self.api_key.clone())),
            &body,
            SERVICE,
        )
        .await?;

        Ok(response
            .value
            .into_iter()
            .map(|doc| self.to_passage(doc))
            .collect())
    }
}
