//! Error taxonomy for the dashboard client.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("[DSH-1001] invalid configuration: {0}")]
    Config(String),

    #[error("[DSH-2001] invalid credentials")]
    InvalidCredentials,

    #[error("[DSH-2002] access forbidden")]
    Forbidden,

    #[error("[DSH-2003] not logged in")]
    NotAuthenticated,

    #[error("[DSH-3001] request failed with HTTP status {status}")]
    Http { status: u16, body: String },

    #[error("[DSH-3002] network error: {0}")]
    Network(String),

    #[error("[DSH-3101] GraphQL error: {message}")]
    Graphql { message: String },

    #[error("[DSH-3201] malformed response: {0}")]
    MalformedResponse(String),

    #[error("[DSH-4001] session store failure: {0}")]
    Session(String),
}

impl DashboardError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "DSH-1001",
            Self::InvalidCredentials => "DSH-2001",
            Self::Forbidden => "DSH-2002",
            Self::NotAuthenticated => "DSH-2003",
            Self::Http { .. } => "DSH-3001",
            Self::Network(_) => "DSH-3002",
            Self::Graphql { .. } => "DSH-3101",
            Self::MalformedResponse(_) => "DSH-3201",
            Self::Session(_) => "DSH-4001",
        }
    }

    /// True when the stored session can no longer be used and the user has to log in again.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::InvalidCredentials | Self::Forbidden | Self::NotAuthenticated => true,
            Self::Http { status, .. } => *status == 401 || *status == 403,
            // Hasura reports expired or malformed tokens as GraphQL errors on a 200.
            Self::Graphql { message } => {
                let m = message.to_lowercase();
                m.contains("jwt") || m.contains("unauthorized")
            }
            _ => false,
        }
    }

    /// Short text shown inline to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => "Invalid username/email or password.".to_string(),
            Self::Forbidden => "Access forbidden for this account.".to_string(),
            Self::NotAuthenticated => "You are not logged in.".to_string(),
            Self::Http { status, .. } => format!("Request failed (HTTP {}).", status),
            Self::Network(_) => "Could not reach the server. Check your connection.".to_string(),
            Self::Graphql { message } => message.clone(),
            Self::MalformedResponse(detail) => format!("Unexpected server response: {}", detail),
            Self::Config(detail) => format!("Configuration error: {}", detail),
            Self::Session(detail) => format!("Session storage error: {}", detail),
        }
    }
}

impl From<rusqlite::Error> for DashboardError {
    fn from(err: rusqlite::Error) -> Self {
        DashboardError::Session(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_credentials_distinct_from_network() {
        let auth = DashboardError::InvalidCredentials;
        let net = DashboardError::Network("connection refused".to_string());
        assert_ne!(auth.code(), net.code());
        assert!(auth.is_auth_failure());
        assert!(!net.is_auth_failure());
    }

    #[test]
    fn test_expired_jwt_graphql_error_is_auth_failure() {
        let err = DashboardError::Graphql {
            message: "Could not verify JWT: JWTExpired".to_string(),
        };
        assert!(err.is_auth_failure());
        assert_eq!(err.user_message(), "Could not verify JWT: JWTExpired");
    }

    #[test]
    fn test_display_carries_code() {
        let err = DashboardError::Http { status: 502, body: String::new() };
        assert!(err.to_string().starts_with("[DSH-3001]"));
        assert_eq!(err.user_message(), "Request failed (HTTP 502).");
    }
}
