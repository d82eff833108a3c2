//! Wire types for the canonical Mixto schema.
//!
//! # Design
//! Read-side types (`Workspace`, `Entry`, `Commit`, `GraphQlResponse`) are
//! projections of server state: decoded, never built by the client. Unknown
//! fields are ignored and missing optional fields default, so a server that
//! adds fields does not break decoding. Write-side payloads (`NewCommit`,
//! `GraphQlRequest`) are one-shot values serialized into a request body.
//!
//! These types are defined independently of the mock server's; integration
//! tests catch drift between the two.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A top-level container for entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    #[serde(rename = "workspace")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub commit_count: u64,
    #[serde(default)]
    pub flags_count: u64,
    #[serde(default)]
    pub time_updated: i64,
}

/// A case within a workspace, with the commits attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "entry_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub time_created: i64,
    #[serde(default)]
    pub time_updated: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub commits: Vec<Commit>,
}

/// A record attached to an entry, as echoed back by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(rename = "commit_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub commit_type: String,
    #[serde(default)]
    pub time_updated: i64,
}

/// The only commit type this client creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    Tool,
}

/// Request payload for creating a commit. `data` is opaque to the client.
#[derive(Debug, Clone, Serialize)]
pub struct NewCommit<'a> {
    pub data: &'a Value,
    pub title: &'a str,
    #[serde(rename = "type")]
    pub commit_type: CommitType,
}

impl<'a> NewCommit<'a> {
    pub fn tool(data: &'a Value, title: &'a str) -> Self {
        Self {
            data,
            title,
            commit_type: CommitType::Tool,
        }
    }
}

/// Request payload for the generic query endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<&'a Map<String, Value>>,
}

/// Untyped result envelope of the generic query endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Treat an explicit `null` the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
