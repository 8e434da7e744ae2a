//! PostgREST-style REST client.
//!
//! Each collection maps to `{base_url}/rest/v1/{table}`. Rows are selected
//! with `id=eq.{uuid}` / `mission_id=eq.{uuid}` filters, writes ask for
//! `Prefer: return=representation`, and counts read the total from the
//! `Content-Range` header.

use std::time::Duration;

use async_trait::async_trait;
use inspecta_core::{Collection, ConfigError, RemoteError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use uuid::Uuid;

use crate::service::RemoteDataService;

const REST_PREFIX: &str = "/rest/v1";
const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";

/// Connection settings for [`RestRemoteClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl RestClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// HTTP client for the remote data service.
#[derive(Clone)]
pub struct RestRemoteClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
    timeout_ms: u64,
}

impl std::fmt::Debug for RestRemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestRemoteClient")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl RestRemoteClient {
    pub fn new(config: &RestClientConfig) -> Result<Self, ConfigError> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "remote.base_url".to_string(),
                value: config.base_url.clone(),
                reason: "must start with http:// or https://".to_string(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "remote".to_string(),
                value: config.base_url.clone(),
                reason: e.to_string(),
            })?;

        let auth_header = build_auth_headers(&config.api_key)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header,
            timeout_ms: config.request_timeout.as_millis() as u64,
        })
    }

    fn table_url(&self, collection: Collection) -> String {
        format!("{}{}/{}", self.base_url, REST_PREFIX, collection.as_str())
    }

    fn request(&self, method: reqwest::Method, collection: Collection) -> RequestBuilder {
        self.client
            .request(method, self.table_url(collection))
            .headers(self.auth_header.clone())
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, RemoteError> {
        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, body))
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Value>, RemoteError> {
        let response = self.send(request).await?;
        parse_rows(response).await
    }

    fn transport_error(&self, e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else if e.is_decode() {
            RemoteError::InvalidResponse {
                reason: e.to_string(),
            }
        } else {
            RemoteError::Transport {
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl RemoteDataService for RestRemoteClient {
    async fn create(&self, collection: Collection, entity: &Value) -> Result<Value, RemoteError> {
        let request = self
            .request(reqwest::Method::POST, collection)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(entity);
        first_row(self.rows(request).await?, "create")
    }

    async fn read(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, RemoteError> {
        let request = self
            .request(reqwest::Method::GET, collection)
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        Ok(self.rows(request).await?.into_iter().next())
    }

    async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        patch: &Value,
    ) -> Result<Value, RemoteError> {
        let request = self
            .request(reqwest::Method::PATCH, collection)
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(patch);
        let rows = self.rows(request).await?;
        rows.into_iter().next().ok_or_else(|| RemoteError::Rejected {
            status: StatusCode::NOT_FOUND.as_u16(),
            message: format!("no {} row with id {}", collection, id),
        })
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, RemoteError> {
        let request = self
            .request(reqwest::Method::DELETE, collection)
            .query(&[("id", eq(id))])
            .header("Prefer", RETURN_REPRESENTATION);
        Ok(!self.rows(request).await?.is_empty())
    }

    async fn delete_by_mission(
        &self,
        collection: Collection,
        mission_id: Uuid,
    ) -> Result<(), RemoteError> {
        let request = self
            .request(reqwest::Method::DELETE, collection)
            .query(&[("mission_id", eq(mission_id))]);
        self.send(request).await?;
        Ok(())
    }

    async fn list(
        &self,
        collection: Collection,
        mission_id: Option<Uuid>,
    ) -> Result<Vec<Value>, RemoteError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.asc".to_string()),
        ];
        if let Some(mission_id) = mission_id {
            query.push(("mission_id", eq(mission_id)));
        }
        let request = self.request(reqwest::Method::GET, collection).query(&query);
        self.rows(request).await
    }

    async fn count(&self, collection: Collection) -> Result<u64, RemoteError> {
        let request = self
            .request(reqwest::Method::GET, collection)
            .query(&[("select", "id"), ("limit", "1")])
            .header("Prefer", COUNT_EXACT);
        let response = self.send(request).await?;
        let header = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        header
            .as_deref()
            .and_then(parse_content_range_total)
            .ok_or_else(|| RemoteError::InvalidResponse {
                reason: format!("missing or invalid Content-Range: {:?}", header),
            })
    }

    async fn test_connection(&self) -> bool {
        let request = self
            .request(reqwest::Method::GET, Collection::Missions)
            .query(&[("select", "id"), ("limit", "1")]);
        match self.send(request).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Remote connection test failed");
                false
            }
        }
    }
}

fn eq(id: Uuid) -> String {
    format!("eq.{}", id)
}

fn first_row(rows: Vec<Value>, operation: &str) -> Result<Value, RemoteError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| RemoteError::InvalidResponse {
            reason: format!("{} returned no representation", operation),
        })
}

async fn parse_rows(response: reqwest::Response) -> Result<Vec<Value>, RemoteError> {
    let text = response.text().await.map_err(|e| RemoteError::Transport {
        reason: e.to_string(),
    })?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(rows)) => Ok(rows),
        Ok(row @ Value::Object(_)) => Ok(vec![row]),
        Ok(other) => Err(RemoteError::InvalidResponse {
            reason: format!("expected rows, got {}", other),
        }),
        Err(e) => Err(RemoteError::InvalidResponse {
            reason: e.to_string(),
        }),
    }
}

/// Map a non-success status to the error taxonomy.
pub fn classify_status(status: StatusCode, body: String) -> RemoteError {
    let code = status.as_u16();
    match code {
        401 | 403 => RemoteError::PermissionDenied { status: code },
        408 | 429 => RemoteError::Transport {
            reason: format!("HTTP {}: {}", code, body),
        },
        _ if status.is_server_error() => RemoteError::Transport {
            reason: format!("HTTP {}: {}", code, body),
        },
        _ => RemoteError::Rejected {
            status: code,
            message: extract_message(&body),
        },
    }
}

/// Pull the `message` field out of a PostgREST error body, if present.
fn extract_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/0`.
pub fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

fn build_auth_headers(api_key: &str) -> Result<HeaderMap, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: "remote.api_key".to_string(),
        value: "<redacted>".to_string(),
        reason,
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("apikey"),
        HeaderValue::from_str(api_key).map_err(|e| invalid(e.to_string()))?,
    );
    let bearer = format!("Bearer {}", api_key);
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&bearer).map_err(|e| invalid(e.to_string()))?,
    );
    Ok(headers)
}
