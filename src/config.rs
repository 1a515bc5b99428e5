use std::time::Duration;

use url::Url;

use crate::error::{DashboardError, Result};

pub const DEFAULT_DOMAIN: &str = "learn.01founders.co";

/// Which data the second chart of the report shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieChartKind {
    /// Passed vs failed projects.
    Grades,
    /// Audit XP given vs received.
    Audits,
}

impl PieChartKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "grades" | "pass-fail" | "passfail" => Some(PieChartKind::Grades),
            "audits" | "audit" => Some(PieChartKind::Audits),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PieChartKind::Grades => "grades",
            PieChartKind::Audits => "audits",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub domain: String,
    pub signin_url: String,
    pub graphql_url: String,
    pub session_path: String,
    pub timeout_secs: u64,
    pub pie_chart: PieChartKind,
    pub out_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        let domain = std::env::var("DASHBOARD_DOMAIN").unwrap_or_else(|_| DEFAULT_DOMAIN.to_string());
        Self {
            signin_url: std::env::var("DASHBOARD_SIGNIN_URL").unwrap_or_else(|_| signin_url_for(&domain)),
            graphql_url: std::env::var("DASHBOARD_GRAPHQL_URL").unwrap_or_else(|_| graphql_url_for(&domain)),
            session_path: std::env::var("DASHBOARD_SESSION_PATH").unwrap_or_else(|_| "./dashboard-session.sqlite".to_string()),
            timeout_secs: std::env::var("DASHBOARD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(30),
            pie_chart: std::env::var("DASHBOARD_PIE").ok().and_then(|v| PieChartKind::parse(&v)).unwrap_or(PieChartKind::Audits),
            out_path: std::env::var("DASHBOARD_OUT").unwrap_or_else(|_| "profile.html".to_string()),
            domain,
        }
    }

    /// Point both endpoints at another host, keeping the fixed paths.
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self.signin_url = signin_url_for(domain);
        self.graphql_url = graphql_url_for(domain);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Reject endpoint URLs that would never reach an HTTP server.
    pub fn validate(&self) -> Result<()> {
        for (name, raw) in [("signin_url", &self.signin_url), ("graphql_url", &self.graphql_url)] {
            let parsed = Url::parse(raw)
                .map_err(|e| DashboardError::Config(format!("{} {:?}: {}", name, raw, e)))?;
            if parsed.scheme() != "https" && parsed.scheme() != "http" {
                return Err(DashboardError::Config(format!(
                    "{} must be http(s), got {}",
                    name,
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }
}

pub fn signin_url_for(domain: &str) -> String {
    format!("https://{}/api/auth/signin", domain)
}

pub fn graphql_url_for(domain: &str) -> String {
    format!("https://{}/api/graphql-engine/v1/graphql", domain)
}
