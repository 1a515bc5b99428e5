//! Bearer token handling: the sign-in response shapes and local payload decoding.
//!
//! The payload is decoded without signature verification; it only serves to
//! learn who is logged in. The server remains the authority on the token.

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DashboardError, Result};

/// Fields a sign-in object may carry the token under, in priority order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenFields {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    jwt: Option<String>,
    #[serde(default, rename = "authToken")]
    auth_token: Option<String>,
}

impl TokenFields {
    fn pick(self) -> Option<String> {
        [self.token, self.access_token, self.jwt, self.auth_token]
            .into_iter()
            .flatten()
            .map(|t| t.trim().to_string())
            .find(|t| !t.is_empty())
    }
}

/// A sign-in object: token fields at the top level, under `data`, or both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenObject {
    #[serde(default)]
    data: Option<Value>,
    #[serde(flatten)]
    fields: TokenFields,
}

impl TokenObject {
    /// `data` wins when it carries a token; anything else under `data` is ignored.
    fn pick(self) -> Option<String> {
        self.data
            .and_then(|data| serde_json::from_value::<TokenFields>(data).ok())
            .and_then(TokenFields::pick)
            .or_else(|| self.fields.pick())
    }
}

/// Known sign-in response bodies.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenResponse {
    /// `"eyJ..."`
    Bare(String),
    /// `{"token": "..."}`, `{"data": {"jwt": "..."}}` and friends
    Object(TokenObject),
}

impl TokenResponse {
    pub fn into_token(self) -> Option<String> {
        match self {
            TokenResponse::Bare(t) => Some(t.trim().to_string()).filter(|t| !t.is_empty()),
            TokenResponse::Object(object) => object.pick(),
        }
    }
}

fn looks_like_jwt(text: &str) -> bool {
    let parts: Vec<&str> = text.split('.').collect();
    parts.len() == 3 && parts.iter().all(|p| !p.is_empty() && !p.contains(char::is_whitespace))
}

/// Extract the bearer token from a successful sign-in body.
pub fn extract_token(body: &str) -> Result<String> {
    let trimmed = body.trim();
    match serde_json::from_str::<TokenResponse>(trimmed) {
        Ok(shape) => shape
            .into_token()
            .ok_or_else(|| DashboardError::MalformedResponse("token not found in sign-in response".to_string())),
        // Some deployments answer with the token as plain text.
        Err(_) if looks_like_jwt(trimmed) => Ok(trimmed.to_string()),
        Err(e) => Err(DashboardError::MalformedResponse(format!("sign-in body is not a token: {}", e))),
    }
}

/// Identity learned from the token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecodedIdentity {
    Claims(TokenClaims),
    Invalid { error: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, deserialize_with = "string_or_number")]
    pub sub: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn string_or_number<'de, D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl DecodedIdentity {
    /// Numeric user id: `sub`, else the Hasura `x-hasura-user-id` claim.
    pub fn user_id(&self) -> Option<i64> {
        let DecodedIdentity::Claims(claims) = self else {
            return None;
        };
        if let Some(id) = claims.sub.as_deref().and_then(|s| s.parse().ok()) {
            return Some(id);
        }
        claims
            .extra
            .get("https://hasura.io/jwt/claims")
            .and_then(|c| c.get("x-hasura-user-id"))
            .and_then(|v| match v {
                Value::String(s) => s.parse().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            })
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, DecodedIdentity::Claims(_))
    }

    /// True when the token carries an `exp` in the past.
    pub fn is_expired(&self, now_ts: i64) -> bool {
        match self {
            DecodedIdentity::Claims(TokenClaims { exp: Some(exp), .. }) => *exp <= now_ts,
            _ => false,
        }
    }
}

fn decode_payload(token: &str) -> std::result::Result<TokenClaims, String> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "token has no payload segment".to_string())?;

    let mut padded = payload.trim_end_matches('=').to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| format!("base64 decode error: {}", e))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("payload is not JSON: {}", e))
}

/// Decode the middle JWT segment. Never fails: problems become `Invalid`.
pub fn decode_identity(token: &str) -> DecodedIdentity {
    match decode_payload(token) {
        Ok(claims) => DecodedIdentity::Claims(claims),
        Err(error) => DecodedIdentity::Invalid { error },
    }
}
