use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client, StatusCode};

use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::logging::log_signin;

pub mod token;

use token::{decode_identity, extract_token, DecodedIdentity};

/// A successful sign-in.
#[derive(Debug, Clone)]
pub struct Login {
    pub token: String,
    pub identity: DecodedIdentity,
}

#[async_trait]
pub trait CredentialExchange: Send + Sync {
    /// Exchange a username or email plus password for a bearer token.
    async fn sign_in(&self, identifier: &str, password: &str) -> Result<Login>;
}

/// `Authorization: Basic base64(identifier:password)`
pub fn basic_auth_header(identifier: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", identifier, password)))
}

pub struct SigninClient {
    client: Client,
    url: String,
}

impl SigninClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| DashboardError::Config(format!("http client: {}", e)))?;
        Ok(Self::with_client(client, &cfg.signin_url))
    }

    pub fn with_client(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

fn status_error(status: StatusCode, body: String) -> DashboardError {
    match status {
        StatusCode::UNAUTHORIZED => DashboardError::InvalidCredentials,
        StatusCode::FORBIDDEN => DashboardError::Forbidden,
        other => DashboardError::Http {
            status: other.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl CredentialExchange for SigninClient {
    async fn sign_in(&self, identifier: &str, password: &str) -> Result<Login> {
        let resp = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, basic_auth_header(identifier, password))
            .send()
            .await
            .map_err(|e| {
                log_signin(identifier, "network_error", None);
                DashboardError::Network(e.to_string())
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| DashboardError::Network(e.to_string()))?;

        if !status.is_success() {
            log_signin(identifier, "rejected", Some(status.as_u16()));
            return Err(status_error(status, body));
        }

        let token = extract_token(&body)?;
        let identity = decode_identity(&token);
        log_signin(identifier, "ok", Some(status.as_u16()));
        Ok(Login { token, identity })
    }
}
