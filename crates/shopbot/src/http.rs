//! Shared request plumbing for the hosted-service clients.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::{BotError, Result};

/// Client with a bounded connect phase. Responses are awaited as long as
/// the service takes.
pub(crate) fn build_client() -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(15))
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_nodelay(true)
        .build()?)
}

/// POST a JSON body and decode a JSON reply.
pub(crate) async fn post_json<B, T>(
    client: &Client,
    url: &str,
    auth: Option<(&'static str, String)>,
    body: &B,
    service: &'static str,
) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let mut request = client.post(url).json(body);
    if let Some((header, value)) = auth {
        request = request.header(header, value);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            tracing::error!(service, url = %redact_query(url), "Request timed out");
        } else if e.is_connect() {
            tracing::error!(service, url = %redact_query(url), error = %e, "Connection failed");
        } else {
            tracing::error!(service, url = %redact_query(url), error = %e, "Request failed");
        }
        BotError::Http(e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(service, status = %status, error = %body, "API returned error");
        return Err(BotError::Api {
            service,
            status: status.as_u16(),
            body,
        });
    }

    parse_json_response(response, service).await
}

/// Parse a response body as JSON, returning a clear error if the server
/// returned HTML (e.g. a gateway error page) instead of valid JSON.
async fn parse_json_response<T: DeserializeOwned>(
    response: reqwest::Response,
    service: &'static str,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    decode_body(&body, status.as_u16(), service)
}

pub(crate) fn decode_body<T: DeserializeOwned>(
    body: &str,
    status: u16,
    service: &'static str,
) -> Result<T> {
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        let preview: String = trimmed.chars().take(200).collect();
        return Err(BotError::Decode {
            service,
            message: format!("HTML instead of JSON (HTTP {}): {}", status, preview),
        });
    }

    serde_json::from_str::<T>(body).map_err(|e| {
        let preview: String = body.chars().take(300).collect();
        BotError::Decode {
            service,
            message: format!("{} (HTTP {}). Response body: {}", e, status, preview),
        }
    })
}

fn redact_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}
