//! Client for a hosted category table behind a PostgREST-style API.
//!
//! Requests go to `{base_url}/rest/v1/{table}` with the API key in both the
//! `apikey` and `Authorization` headers.

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::storage::{Category, CategoryUpdate, DeletedCategory, NewCategory};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const MAX_LIST_RETRIES: u32 = 2;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request timed out after 20s")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid remote configuration: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost)")]
    InsecureBaseUrl,
    #[error("Category {0} not found")]
    NotFound(i64),
}

impl RemoteError {
    fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Timeout | RemoteError::Network(_) => true,
            RemoteError::HttpStatus(status) => *status >= 500,
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    endpoint: Url,
    api_key: SecretString,
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl RemoteStore {
    pub fn new(base_url: &str, table: &str, api_key: SecretString) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("doceria/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let endpoint = endpoint_url(base_url, table)?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// All rows ordered by name. Transient failures are retried with backoff.
    pub async fn list_categories(&self) -> Result<Vec<Category>, RemoteError> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("select", "id,nome,parent_id,descricao,created_at,updated_at")
            .append_pair("order", "nome.asc");

        let mut attempt = 0;
        loop {
            match self.execute(self.client.get(url.clone())).await {
                Ok(body) => return decode(&body),
                Err(e) if e.is_retryable() && attempt < MAX_LIST_RETRIES => {
                    let delay = 1u64 << attempt; // 1s, 2s
                    tracing::debug!(error = %e, retry = attempt + 1, delay_secs = delay, "Retrying category list");
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn create_category(&self, new: &NewCategory) -> Result<Category, RemoteError> {
        let body = serde_json::to_string(new)?;
        let request = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .body(body);

        let rows: Vec<Category> = decode(&self.execute(request).await?)?;
        rows.into_iter().next().ok_or_else(|| {
            RemoteError::Decode(serde::de::Error::custom("insert returned no rows"))
        })
    }

    /// PATCH one row. An empty representation means no row matched `id`.
    pub async fn update_category(
        &self,
        id: i64,
        update: &CategoryUpdate,
    ) -> Result<Category, RemoteError> {
        let body = serde_json::to_string(update)?;
        let request = self
            .client
            .patch(self.id_url(id))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .body(body);

        let rows: Vec<Category> = decode(&self.execute(request).await?)?;
        rows.into_iter().next().ok_or(RemoteError::NotFound(id))
    }

    /// Descendants are removed by the server's cascading foreign key. The
    /// representation only holds the matched row, so the cascade size is
    /// unknown. `None` when no row matched `id`.
    pub async fn delete_category(&self, id: i64) -> Result<Option<DeletedCategory>, RemoteError> {
        let request = self
            .client
            .delete(self.id_url(id))
            .header("Prefer", "return=representation");

        let rows: Vec<Category> = decode(&self.execute(request).await?)?;
        Ok(rows.into_iter().next().map(|category| DeletedCategory {
            category,
            removed: None,
        }))
    }

    fn id_url(&self, id: i64) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("id", &format!("eq.{}", id));
        url
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String, RemoteError> {
        let key = self.api_key.expose_secret();
        let request = request
            .header("apikey", key)
            .header("Authorization", format!("Bearer {}", key))
            .header("Accept", "application/json");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                tracing::debug!(status = status.as_u16(), "Remote store rejected request");
                return Err(RemoteError::HttpStatus(status.as_u16()));
            }
            read_limited_text(response, MAX_RESPONSE_SIZE).await
        };

        tokio::time::timeout(REQUEST_TIMEOUT, exchange)
            .await
            .map_err(|_| RemoteError::Timeout)?
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, RemoteError> {
    Ok(serde_json::from_str(body)?)
}

/// `{base}/rest/v1/{table}`, refusing plain HTTP to anything but localhost.
fn endpoint_url(base_url: &str, table: &str) -> Result<Url, RemoteError> {
    let base = Url::parse(base_url.trim_end_matches('/'))
        .map_err(|e| RemoteError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;

    match base.scheme() {
        "https" => {}
        "http" if matches!(base.host_str(), Some("localhost" | "127.0.0.1")) => {
            tracing::warn!(base_url = %base, "Using non-HTTPS remote store (localhost only)");
        }
        "http" => {
            tracing::error!(base_url = %base, "Rejecting non-HTTPS remote store URL");
            return Err(RemoteError::InsecureBaseUrl);
        }
        other => {
            return Err(RemoteError::InvalidBaseUrl(format!(
                "unsupported scheme '{}'",
                other
            )))
        }
    }

    if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RemoteError::InvalidBaseUrl(format!(
            "invalid table name '{}'",
            table
        )));
    }

    let joined = format!("{}/rest/v1/{}", base.as_str().trim_end_matches('/'), table);
    Url::parse(&joined).map_err(|e| RemoteError::InvalidBaseUrl(e.to_string()))
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, RemoteError> {
    if response
        .content_length()
        .is_some_and(|len| len > limit as u64)
    {
        return Err(RemoteError::ResponseTooLarge(limit));
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(RemoteError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| RemoteError::InvalidUtf8)
}
