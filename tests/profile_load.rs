//! Profile loading over an in-process data source.

use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde_json::{json, Value};

use xpdash::auth::token::decode_identity;
use xpdash::error::{DashboardError, Result};
use xpdash::graphql::{DataSource, GraphqlRequest};
use xpdash::model::level::LevelSource;
use xpdash::profile::{load_bundle, load_profile, settle_failure};
use xpdash::session::{MemorySessionStore, SessionStore, IDENTITY_KEY};

/// Answers each request from a fixed table; `fail` names requests that error.
struct StaticDataSource {
    fail: Vec<&'static str>,
    seen: Mutex<Vec<String>>,
}

impl StaticDataSource {
    fn new() -> Self {
        Self::failing(&[])
    }

    fn failing(fail: &[&'static str]) -> Self {
        Self {
            fail: fail.to_vec(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

/// Route key: operation name plus what the filter asks for.
fn route(request: &GraphqlRequest) -> String {
    let filter = request.variables.to_string();
    let detail = if filter.contains("%level%") {
        "probe"
    } else if filter.contains("skill_%") {
        "skills"
    } else if filter.contains(r#"["xp"]"#) {
        "xp"
    } else if filter.contains(r#"["up"]"#) {
        "up"
    } else if filter.contains(r#"["down"]"#) {
        "down"
    } else {
        "all"
    };
    format!("{}:{}", request.name, detail)
}

fn rows(route: &str) -> Value {
    match route {
        "User:all" => json!({"user": [{
            "id": 12, "login": "ada", "campus": "london",
            "createdAt": "2023-09-01T08:00:00Z",
            "attrs": {"firstName": "Ada", "lastName": "Lovelace"}
        }]}),
        "Transactions:xp" => json!({"transaction": [
            {"id": 1, "type": "xp", "amount": 12000, "createdAt": "2024-01-05T00:00:00Z",
             "path": "/london/div-01/forum", "object": {"name": "forum", "type": "project"}},
            {"id": 2, "type": "xp", "amount": 500, "createdAt": "2024-01-02T00:00:00Z",
             "path": "/london/div-01/quad", "object": {"name": "quad", "type": "exercise"}},
            {"id": 3, "type": "xp", "amount": 8000, "createdAt": "2024-01-03T00:00:00Z",
             "path": "/london/div-01/ascii-art", "object": {"name": "ascii-art", "type": "project"}}
        ]}),
        "Transactions:up" => json!({"transaction": [
            {"id": 4, "type": "up", "amount": 3000, "createdAt": "2024-01-04T00:00:00Z", "path": "/a", "object": null}
        ]}),
        "Transactions:down" => json!({"transaction": [
            {"id": 5, "type": "down", "amount": 1500, "createdAt": "2024-01-04T00:00:00Z", "path": "/b", "object": null}
        ]}),
        "Transactions:skills" => json!({"transaction": [
            {"id": 6, "type": "skill_go", "amount": 35, "createdAt": "2024-01-03T00:00:00Z", "path": "/c", "object": null},
            {"id": 7, "type": "skill_go", "amount": 50, "createdAt": "2024-01-06T00:00:00Z", "path": "/c", "object": null},
            {"id": 8, "type": "skill_html", "amount": 20, "createdAt": "2024-01-06T00:00:00Z", "path": "/c", "object": null}
        ]}),
        "Progress:all" | "Results:all" => {
            let root = if route.starts_with("Progress") { "progress" } else { "result" };
            json!({root: [
                {"id": 9, "grade": 1.0, "createdAt": "2024-01-05T00:00:00Z",
                 "path": "/london/div-01/forum", "object": {"name": "forum", "type": "project"}},
                {"id": 10, "grade": 0.0, "createdAt": "2024-01-06T00:00:00Z",
                 "path": "/london/div-01/lem-in", "object": {"name": "lem-in", "type": "project"}},
                {"id": 11, "grade": null, "createdAt": "2024-01-07T00:00:00Z",
                 "path": "/london/div-01/groupie", "object": {"name": "groupie", "type": "project"}}
            ]})
        }
        "Progress:probe" => json!({"progress": [
            {"id": 12, "grade": 14.0, "createdAt": "2024-01-07T00:00:00Z",
             "path": "/london/level", "object": {"name": "Level", "type": "level"}}
        ]}),
        "Transactions:probe" => json!({"transaction": []}),
        other => panic!("unexpected request {}", other),
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value> {
        let key = route(request);
        self.seen.lock().unwrap().push(key.clone());
        if self.fail.iter().any(|f| *f == key) {
            return Err(DashboardError::Http {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(rows(&key))
    }
}

fn logged_in_store(user_id: i64) -> MemorySessionStore {
    let payload = format!(r#"{{"sub":"{}"}}"#, user_id);
    let token = format!("eyJhbGciOiJIUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(payload));
    let mut store = MemorySessionStore::new();
    store.save_login(&token, &decode_identity(&token)).unwrap();
    store
}

#[tokio::test]
async fn builds_full_view_from_all_queries() {
    let source = StaticDataSource::new();
    let store = logged_in_store(12);
    let (bundle, view) = load_profile(&source, &store).await.unwrap();

    let mut seen = source.seen();
    seen.sort();
    assert_eq!(seen.len(), 9);
    assert!(seen.contains(&"Progress:probe".to_string()));

    assert_eq!(bundle.xp.len(), 3);
    assert_eq!(view.identity.display_name, "Ada Lovelace");
    // the exercise grant is filtered out of the panel
    assert_eq!(view.xp.total, 20_000);
    assert_eq!(view.xp.series.len(), 2);
    assert_eq!(view.audits.ratio, 2.0);
    assert_eq!(view.skills[0].label, "Go Programming");
    assert_eq!(view.skills[0].percent, 50);
    assert_eq!((view.success.passed, view.success.failed, view.success.total), (1, 1, 2));
    assert_eq!(view.level.level, 14);
    assert_eq!(view.level.source, LevelSource::LevelProgress);
    assert_eq!(view.recent_grades[0].name, "lem-in");
}

/// Records every request's variables and answers with empty rows.
struct Capture(Mutex<Vec<Value>>);

impl Capture {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    /// How many requests were filtered to `user_id`, out of how many sent.
    fn scoped_to(&self, user_id: i64) -> (usize, usize) {
        let vars = self.0.lock().unwrap();
        let needle = format!(r#"{{"userId":{{"_eq":{}}}}}"#, user_id);
        let scoped = vars.iter().filter(|v| v.to_string().contains(&needle)).count();
        (scoped, vars.len())
    }
}

#[async_trait]
impl DataSource for Capture {
    async fn execute(&self, request: &GraphqlRequest) -> Result<Value> {
        self.0.lock().unwrap().push(request.variables.clone());
        let root = match request.name {
            "User" => return Ok(json!({"user": [{"id": 33, "login": "bob"}]})),
            "Transactions" => "transaction",
            "Progress" => "progress",
            _ => "result",
        };
        Ok(json!({root: []}))
    }
}

#[tokio::test]
async fn user_id_from_session_scopes_queries() {
    let source = Capture::new();
    let store = logged_in_store(33);
    load_profile(&source, &store).await.unwrap();

    // everything except the user query is filtered by the session's user
    let (scoped, sent) = source.scoped_to(33);
    assert_eq!(sent, 9);
    assert_eq!(scoped, sent - 1);

    // recent grades only ever need project results
    let vars = source.0.lock().unwrap();
    let projects_only = vars
        .iter()
        .filter(|v| v.to_string().contains(r#"{"object":{"type":{"_eq":"project"}}}"#))
        .count();
    assert_eq!(projects_only, 1);
}

#[tokio::test]
async fn unreadable_stored_identity_is_rebuilt_from_token() {
    let mut store = logged_in_store(33);
    store.set(IDENTITY_KEY, "{not json").unwrap();

    let source = Capture::new();
    let (_, view) = load_profile(&source, &store).await.unwrap();
    assert_eq!(view.identity.login, "bob");
    let (scoped, sent) = source.scoped_to(33);
    assert_eq!(scoped, sent - 1);
    assert!(store.token().unwrap().is_some());
}

#[tokio::test]
async fn token_without_stored_identity_still_scopes_queries() {
    let mut store = logged_in_store(33);
    store.remove(IDENTITY_KEY).unwrap();

    let source = Capture::new();
    load_profile(&source, &store).await.unwrap();
    let (scoped, sent) = source.scoped_to(33);
    assert_eq!(scoped, sent - 1);
}

#[tokio::test]
async fn any_core_failure_aborts_the_load() {
    for failing in ["User:all", "Transactions:xp", "Transactions:skills", "Results:all"] {
        let source = StaticDataSource::failing(&[failing]);
        let err = load_bundle(&source, Some(12)).await.unwrap_err();
        assert!(matches!(err, DashboardError::Http { status: 500, .. }), "{}", failing);
    }
}

#[tokio::test]
async fn failed_probe_falls_back_to_beginner() {
    let source = StaticDataSource::failing(&["Progress:probe"]);
    let store = logged_in_store(12);
    let (bundle, view) = load_profile(&source, &store).await.unwrap();
    assert!(bundle.level_probe.is_none());
    assert_eq!(view.level.level, 1);
    assert_eq!(view.level.label, "Beginner");
    assert_eq!(view.xp.total, 20_000);
}

#[tokio::test]
async fn missing_session_is_not_authenticated() {
    let source = StaticDataSource::new();
    let store = MemorySessionStore::new();
    let err = load_profile(&source, &store).await.unwrap_err();
    assert!(matches!(err, DashboardError::NotAuthenticated));
    assert!(source.seen().is_empty());
}

#[tokio::test]
async fn auth_failures_clear_the_session() {
    let mut store = logged_in_store(12);
    let transient = DashboardError::Network("timeout".to_string());
    assert!(!settle_failure(&mut store, &transient).unwrap());
    assert!(store.token().unwrap().is_some());

    let expired = DashboardError::Graphql {
        message: "Could not verify JWT: JWTExpired".to_string(),
    };
    assert!(settle_failure(&mut store, &expired).unwrap());
    assert_eq!(store.token().unwrap(), None);
    assert!(store.identity().unwrap().is_none());
}
