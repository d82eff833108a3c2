use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Key accepted by `app()`.
pub const API_KEY: &str = "test-key";

const FIRST_TIMESTAMP: i64 = 1_650_000_000;

/// Request bodies up to this size are accepted; commit data can be large.
const MAX_REQUEST_BODY: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace: String,
    pub title: String,
    pub category: String,
    pub priority: String,
    pub commit_count: u64,
    pub flags_count: u64,
    pub time_updated: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entry {
    pub entry_id: String,
    pub title: String,
    pub category: String,
    pub priority: String,
    pub time_created: i64,
    pub time_updated: i64,
    pub commits: Vec<Commit>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Commit {
    pub commit_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub commit_type: String,
    pub time_updated: i64,
}

#[derive(Deserialize)]
pub struct NewCommit {
    pub data: Value,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub commit_type: String,
}

#[derive(Deserialize)]
pub struct GqlRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
}

/// In-memory server state.
#[derive(Debug, Default)]
pub struct Store {
    pub api_key: String,
    pub workspaces: Vec<Workspace>,
    pub entries: HashMap<String, Vec<Entry>>,
    pub commit_data: HashMap<Uuid, Value>,
    clock: i64,
}

impl Store {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            clock: FIRST_TIMESTAMP,
            ..Self::default()
        }
    }

    /// Two workspaces: `w1` with entries `e1` and `e2`, and an empty `w2`.
    pub fn seeded(api_key: &str) -> Self {
        let mut store = Self::new(api_key);
        store.add_workspace("w1", "Red team", "pentest", "high");
        store.add_workspace("w2", "CTF", "ctf", "low");
        store.add_entry("w1", "e1", "Recon");
        store.add_entry("w1", "e2", "Exploitation");
        store
    }

    pub fn add_workspace(&mut self, id: &str, title: &str, category: &str, priority: &str) {
        let now = self.tick();
        self.workspaces.push(Workspace {
            workspace: id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            priority: priority.to_string(),
            commit_count: 0,
            flags_count: 0,
            time_updated: now,
        });
        self.entries.entry(id.to_string()).or_default();
    }

    pub fn add_entry(&mut self, workspace: &str, entry_id: &str, title: &str) {
        let now = self.tick();
        self.entries.entry(workspace.to_string()).or_default().push(Entry {
            entry_id: entry_id.to_string(),
            title: title.to_string(),
            category: "web".to_string(),
            priority: "none".to_string(),
            time_created: now,
            time_updated: now,
            commits: Vec::new(),
        });
    }

    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }
}

pub type Db = Arc<RwLock<Store>>;

type Rejection = (StatusCode, String);

pub fn app() -> Router {
    app_with(Store::seeded(API_KEY))
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/api/workspace", get(list_workspaces))
        .route("/api/misc/workspaces/{workspace}", get(list_entries))
        .route("/api/entry/{workspace}/{entry_id}/commit", post(create_commit))
        .route("/api/gql", post(graphql))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authorize(headers: &HeaderMap, store: &Store) -> Result<(), Rejection> {
    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if key == Some(store.api_key.as_str()) {
        return Ok(());
    }
    tracing::warn!("rejected request with missing or invalid API key");
    Err((StatusCode::UNAUTHORIZED, "invalid api key".to_string()))
}

async fn list_workspaces(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Workspace>>, Rejection> {
    let store = db.read().await;
    authorize(&headers, &store)?;
    Ok(Json(store.workspaces.clone()))
}

async fn list_entries(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(workspace): Path<String>,
) -> Result<Json<Vec<Entry>>, Rejection> {
    let store = db.read().await;
    authorize(&headers, &store)?;
    store
        .entries
        .get(&workspace)
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("workspace {workspace} not found")))
}

async fn create_commit(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((workspace, entry_id)): Path<(String, String)>,
    Json(input): Json<NewCommit>,
) -> Result<Json<Commit>, Rejection> {
    let mut store = db.write().await;
    authorize(&headers, &store)?;
    if input.commit_type != "tool" {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("unsupported commit type {}", input.commit_type),
        ));
    }

    let position = store
        .entries
        .get(&workspace)
        .and_then(|entries| entries.iter().position(|e| e.entry_id == entry_id))
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("entry {entry_id} not found in {workspace}")))?;

    let now = store.tick();
    let commit = Commit {
        commit_id: Uuid::new_v4(),
        title: input.title,
        commit_type: input.commit_type,
        time_updated: now,
    };
    if let Some(entry) = store.entries.get_mut(&workspace).and_then(|entries| entries.get_mut(position)) {
        entry.commits.push(commit.clone());
        entry.time_updated = now;
    }

    if let Some(ws) = store.workspaces.iter_mut().find(|w| w.workspace == workspace) {
        ws.commit_count += 1;
        ws.time_updated = now;
    }
    store.commit_data.insert(commit.commit_id, input.data);
    tracing::debug!(%workspace, %entry_id, commit_id = %commit.commit_id, "created commit");

    Ok(Json(commit))
}

/// Resolves the commit-data lookup; any other query is answered with an
/// `error` envelope.
async fn graphql(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<GqlRequest>,
) -> Result<Json<Value>, Rejection> {
    let store = db.read().await;
    authorize(&headers, &store)?;

    if !input.query.contains("mixto_commits_by_pk") {
        return Ok(Json(json!({"data": null, "error": "unsupported query"})));
    }
    let commit = input
        .variables
        .get("commit_id")
        .and_then(Value::as_str)
        .and_then(|id| id.parse::<Uuid>().ok())
        .and_then(|id| store.commit_data.get(&id))
        .map(|data| json!({"data": data}));

    Ok(Json(json!({"data": {"commit": commit}, "error": null})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_serializes_type_field() {
        let commit = Commit {
            commit_id: Uuid::nil(),
            title: "Test".to_string(),
            commit_type: "tool".to_string(),
            time_updated: 1,
        };
        let json = serde_json::to_value(&commit).unwrap();
        assert_eq!(json["commit_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["type"], "tool");
        assert!(json.get("commit_type").is_none());
    }

    #[test]
    fn seeded_store_layout() {
        let store = Store::seeded(API_KEY);
        assert_eq!(store.workspaces.len(), 2);
        assert_eq!(store.entries["w1"].len(), 2);
        assert!(store.entries["w2"].is_empty());
    }

    #[test]
    fn timestamps_increase() {
        let store = Store::seeded(API_KEY);
        let w1 = &store.entries["w1"];
        assert!(w1[1].time_created > w1[0].time_created);
    }

    #[test]
    fn new_commit_requires_type() {
        let result: Result<NewCommit, _> = serde_json::from_str(r#"{"data":1,"title":"t"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn gql_request_variables_default_to_empty() {
        let input: GqlRequest = serde_json::from_str(r#"{"query":"{ a }"}"#).unwrap();
        assert!(input.variables.is_empty());
    }
}
