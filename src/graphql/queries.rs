//! One parameterized query per entity. Filters are typed and rendered into
//! the Hasura `where` boolean expression passed as a variable.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{DataSource, GraphqlRequest};
use crate::error::{DashboardError, Result};
use crate::logging::{log_query, ProfileScope};
use crate::model::records::{Progress, Transaction, User, SKILL_PREFIX};

const USER_QUERY: &str = "query User {
  user { id login campus createdAt attrs }
}";

const TRANSACTIONS_QUERY: &str = "query Transactions($where: transaction_bool_exp) {
  transaction(where: $where, order_by: {createdAt: asc}) {
    id type amount createdAt path
    object { name type }
  }
}";

const PROGRESS_QUERY: &str = "query Progress($where: progress_bool_exp) {
  progress(where: $where, order_by: {createdAt: asc}) {
    id grade createdAt path
    object { name type }
  }
}";

const RESULTS_QUERY: &str = "query Results($where: result_bool_exp) {
  result(where: $where, order_by: {createdAt: asc}) {
    id grade createdAt path
    object { name type }
  }
}";

/// Markers used to probe for explicit level/rank records.
pub const LEVEL_MARKERS: [&str; 2] = ["level", "rank"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub user_id: Option<i64>,
    /// Exact kinds (`type _in`).
    pub kinds: Vec<String>,
    /// Kind prefix (`type _like 'prefix%'`).
    pub kind_prefix: Option<String>,
    /// Case-insensitive substrings matched against kind or object name.
    pub markers: Vec<String>,
}

impl TransactionFilter {
    pub fn kind(kind: &str) -> Self {
        Self {
            kinds: vec![kind.to_string()],
            ..Default::default()
        }
    }

    pub fn skills() -> Self {
        Self {
            kind_prefix: Some(SKILL_PREFIX.to_string()),
            ..Default::default()
        }
    }

    pub fn level_markers() -> Self {
        Self {
            markers: LEVEL_MARKERS.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn for_user(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn to_where(&self) -> Value {
        let mut clauses = Vec::new();
        if let Some(id) = self.user_id {
            clauses.push(json!({"userId": {"_eq": id}}));
        }
        if !self.kinds.is_empty() {
            clauses.push(json!({"type": {"_in": self.kinds}}));
        }
        if let Some(prefix) = &self.kind_prefix {
            clauses.push(json!({"type": {"_like": format!("{}%", prefix)}}));
        }
        if !self.markers.is_empty() {
            let any: Vec<Value> = self
                .markers
                .iter()
                .flat_map(|m| {
                    let pattern = format!("%{}%", m);
                    [
                        json!({"type": {"_ilike": pattern}}),
                        json!({"object": {"name": {"_ilike": pattern}}}),
                    ]
                })
                .collect();
            clauses.push(json!({"_or": any}));
        }
        json!({"_and": clauses})
    }
}

/// Filter shared by `progress` and `result`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressFilter {
    pub user_id: Option<i64>,
    /// `object.type` equality, e.g. "project".
    pub category: Option<String>,
    /// Case-insensitive substrings matched against path, object name or object type.
    pub markers: Vec<String>,
}

impl ProgressFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(category: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            ..Default::default()
        }
    }

    pub fn level_markers() -> Self {
        Self {
            markers: LEVEL_MARKERS.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn for_user(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn to_where(&self) -> Value {
        let mut clauses = Vec::new();
        if let Some(id) = self.user_id {
            clauses.push(json!({"userId": {"_eq": id}}));
        }
        if let Some(category) = &self.category {
            clauses.push(json!({"object": {"type": {"_eq": category}}}));
        }
        if !self.markers.is_empty() {
            let any: Vec<Value> = self
                .markers
                .iter()
                .flat_map(|m| {
                    let pattern = format!("%{}%", m);
                    [
                        json!({"path": {"_ilike": pattern}}),
                        json!({"object": {"name": {"_ilike": pattern}}}),
                        json!({"object": {"type": {"_ilike": pattern}}}),
                    ]
                })
                .collect();
            clauses.push(json!({"_or": any}));
        }
        json!({"_and": clauses})
    }
}

async fn fetch_rows<T: DeserializeOwned>(
    source: &dyn DataSource,
    request: GraphqlRequest,
    root: &str,
) -> Result<Vec<T>> {
    let scope = ProfileScope::with_context("graphql", &[("query", crate::logging::v_str(request.name))]);
    let outcome = source.execute(&request).await;
    log_query(request.name, scope.elapsed_ms(), if outcome.is_ok() { "ok" } else { "error" });

    let mut data = outcome?;
    match data.get_mut(root).map(Value::take) {
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(rows) => serde_json::from_value(rows)
            .map_err(|e| DashboardError::MalformedResponse(format!("{} rows: {}", root, e))),
    }
}

pub async fn fetch_transactions(source: &dyn DataSource, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
    let request = GraphqlRequest {
        name: "Transactions",
        query: TRANSACTIONS_QUERY,
        variables: json!({"where": filter.to_where()}),
    };
    fetch_rows(source, request, "transaction").await
}

pub async fn fetch_progress(source: &dyn DataSource, filter: &ProgressFilter) -> Result<Vec<Progress>> {
    let request = GraphqlRequest {
        name: "Progress",
        query: PROGRESS_QUERY,
        variables: json!({"where": filter.to_where()}),
    };
    fetch_rows(source, request, "progress").await
}

pub async fn fetch_results(source: &dyn DataSource, filter: &ProgressFilter) -> Result<Vec<Progress>> {
    let request = GraphqlRequest {
        name: "Results",
        query: RESULTS_QUERY,
        variables: json!({"where": filter.to_where()}),
    };
    fetch_rows(source, request, "result").await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUser {
    id: i64,
    login: String,
    #[serde(default)]
    campus: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    attrs: Option<Value>,
}

impl From<WireUser> for User {
    fn from(w: WireUser) -> Self {
        let attr = |key: &str| {
            w.attrs
                .as_ref()
                .and_then(|a| a.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
                .filter(|s| !s.trim().is_empty())
        };
        User {
            id: w.id,
            email: attr("email"),
            first_name: attr("firstName"),
            last_name: attr("lastName"),
            login: w.login,
            campus: w.campus,
            created_at: w.created_at,
        }
    }
}

/// The signed-in user; the endpoint only exposes the caller's own row.
pub async fn fetch_user(source: &dyn DataSource) -> Result<User> {
    let request = GraphqlRequest {
        name: "User",
        query: USER_QUERY,
        variables: json!({}),
    };
    let rows: Vec<WireUser> = fetch_rows(source, request, "user").await?;
    rows.into_iter()
        .next()
        .map(User::from)
        .ok_or_else(|| DashboardError::MalformedResponse("no user row returned".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_where_clauses() {
        let w = TransactionFilter::kind("xp").for_user(Some(7)).to_where();
        assert_eq!(
            w,
            json!({"_and": [{"userId": {"_eq": 7}}, {"type": {"_in": ["xp"]}}]})
        );

        let w = TransactionFilter::skills().to_where();
        assert_eq!(w, json!({"_and": [{"type": {"_like": "skill_%"}}]}));
    }

    #[test]
    fn test_level_marker_where() {
        let w = TransactionFilter::level_markers().to_where();
        let any = w["_and"][0]["_or"].as_array().unwrap();
        assert_eq!(any.len(), 4);
        assert_eq!(any[0], json!({"type": {"_ilike": "%level%"}}));
        assert_eq!(any[3], json!({"object": {"name": {"_ilike": "%rank%"}}}));

        let w = ProgressFilter::level_markers().to_where();
        assert_eq!(w["_and"][0]["_or"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn test_progress_where_category() {
        let w = ProgressFilter::category("project").to_where();
        assert_eq!(w, json!({"_and": [{"object": {"type": {"_eq": "project"}}}]}));
        assert_eq!(ProgressFilter::all().to_where(), json!({"_and": []}));
    }

    #[test]
    fn test_user_from_attrs() {
        let wire: WireUser = serde_json::from_value(json!({
            "id": 5,
            "login": "ada",
            "campus": "london",
            "createdAt": "2023-09-01T08:00:00+00:00",
            "attrs": {"firstName": "Ada", "lastName": "", "email": "ada@example.org"}
        }))
        .unwrap();
        let user = User::from(wire);
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name, None);
        assert_eq!(user.email.as_deref(), Some("ada@example.org"));
    }
}
