//! GraphQL data source: one fixed endpoint, bearer-authenticated.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{DashboardError, Result};

pub mod queries;

#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest {
    /// Operation name used for logging; not sent.
    #[serde(skip)]
    pub name: &'static str,
    pub query: &'static str,
    pub variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphqlErrorEntry {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphqlErrorEntry>>,
}

/// Unwraps `{data, errors?}`; a non-empty `errors` wins over any partial data.
pub fn unwrap_envelope(body: &str) -> Result<Value> {
    let envelope: GraphqlEnvelope = serde_json::from_str(body)
        .map_err(|e| DashboardError::MalformedResponse(format!("GraphQL body: {}", e)))?;

    if let Some(first) = envelope.errors.as_ref().and_then(|errs| errs.first()) {
        let message = if first.message.is_empty() {
            "unknown GraphQL error".to_string()
        } else {
            first.message.clone()
        };
        return Err(DashboardError::Graphql { message });
    }

    match envelope.data {
        Some(Value::Null) | None => Err(DashboardError::MalformedResponse("GraphQL response has no data".to_string())),
        Some(data) => Ok(data),
    }
}

/// Anything that can answer a GraphQL request with its `data` object.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value>;
}

pub struct GraphqlClient {
    client: Client,
    url: String,
    token: String,
}

impl GraphqlClient {
    pub fn new(cfg: &Config, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| DashboardError::Config(format!("http client: {}", e)))?;
        Ok(Self::with_client(client, &cfg.graphql_url, token))
    }

    pub fn with_client(client: Client, url: &str, token: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl DataSource for GraphqlClient {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value> {
        let resp = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .json(request)
            .send()
            .await
            .map_err(|e| DashboardError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| DashboardError::Network(e.to_string()))?;

        if !status.is_success() {
            // Hasura still answers with an error envelope on some failures.
            if let Err(err @ DashboardError::Graphql { .. }) = unwrap_envelope(&body) {
                return Err(err);
            }
            return Err(DashboardError::Http {
                status: status.as_u16(),
                body,
            });
        }
        unwrap_envelope(&body)
    }
}
