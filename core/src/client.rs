//! Request builder and typed accessors for the Mixto API.
//!
//! # Design
//! `MixtoClient` holds an immutable `Config`, a `Transport` and a request
//! deadline, and carries no mutable state between calls, so one client can
//! be shared by many threads. Every call goes through one generic request
//! builder that owns URL joining, JSON body encoding, header injection and
//! status classification. Accessors only pick an endpoint and a body, then
//! decode the returned bytes.
//!
//! Each accessor is also split into a pure `build_*` method producing an
//! `HttpRequest` and a `parse_*` method consuming an `HttpResponse`, for
//! hosts that run the HTTP round trip themselves.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::schema;
use crate::transport::{Transport, UreqTransport, DEFAULT_TIMEOUT};
use crate::types::{Commit, Entry, GraphQlRequest, GraphQlResponse, NewCommit, Workspace};

pub const USER_AGENT: &str = "mixto-lite-rust";
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Lowest status code treated as a failure.
const FIRST_ERROR_STATUS: u16 = 301;

const COMMIT_DATA_QUERY: &str = r#"query q($commit_id: uuid = "") {
  commit: mixto_commits_by_pk(commit_id: $commit_id) {
    data
  }
}"#;

/// Synchronous, stateless client for the Mixto API.
#[derive(Debug, Clone)]
pub struct MixtoClient<T = UreqTransport> {
    config: Config,
    transport: T,
    timeout: Duration,
}

impl MixtoClient<UreqTransport> {
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> MixtoClient<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self {
            config,
            transport,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Deadline attached to every request this client sends.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ---------------------------------------------------------------------------
    // Request builder
    // ---------------------------------------------------------------------------

    /// Describe a request against `endpoint`, joined onto the host's path.
    ///
    /// `body`, when present, is sent as JSON with `Content-Type:
    /// application/json`. `query` pairs are URL-encoded onto the URL; an
    /// empty slice adds no query string. Nothing touches the network.
    pub fn build_request<B>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&B>,
        query: &[(&str, &str)],
    ) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        let segments = endpoint.split('/').filter(|s| !s.is_empty());
        self.build(method, segments, body, query)
    }

    /// Send a request and return the raw response body.
    ///
    /// Fails with `Error::Api` (carrying the body) for status 301 and above.
    pub fn request<B>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: Option<&B>,
        query: &[(&str, &str)],
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let request = self.build_request(method, endpoint, body, query)?;
        self.send(&request)
    }

    fn build<'a, B>(
        &self,
        method: HttpMethod,
        segments: impl IntoIterator<Item = &'a str>,
        body: Option<&B>,
        query: &[(&str, &str)],
    ) -> Result<HttpRequest>
    where
        B: Serialize + ?Sized,
    {
        self.config.validate()?;
        let url = self.compose_url(segments, query)?;
        let body = body
            .map(|b| serde_json::to_vec(b))
            .transpose()
            .map_err(Error::Encoding)?;

        let mut headers = vec![
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            (API_KEY_HEADER.to_string(), self.config.api_key().to_string()),
        ];
        if body.is_some() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers,
            body,
            timeout: Some(self.timeout),
        })
    }

    /// Append `segments` to the host's own path, one segment at a time, so
    /// separators are never doubled or lost and each segment is escaped.
    /// Empty, `.` and `..` segments are rejected rather than dropped.
    fn compose_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.config.base_url()?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::Configuration("host URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                if matches!(segment, "" | "." | "..") {
                    return Err(Error::Configuration(format!("invalid path segment {segment:?}")));
                }
                path.push(segment);
            }
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn send(&self, request: &HttpRequest) -> Result<Vec<u8>> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.execute(request)?;
        debug!(status = response.status, bytes = response.body.len(), "received response");
        check_status(response)
    }

    // ---------------------------------------------------------------------------
    // Workspaces
    // ---------------------------------------------------------------------------

    pub fn build_list_workspaces(&self) -> Result<HttpRequest> {
        self.build_request::<()>(HttpMethod::Get, schema::WORKSPACES, None, &[])
    }

    pub fn parse_list_workspaces(&self, response: HttpResponse) -> Result<Vec<Workspace>> {
        decode(&check_status(response)?)
    }

    /// All workspaces visible to the API key, in server order.
    pub fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let request = self.build_list_workspaces()?;
        decode(&self.send(&request)?)
    }

    // ---------------------------------------------------------------------------
    // Entries
    // ---------------------------------------------------------------------------

    pub fn build_list_entries(&self) -> Result<HttpRequest> {
        let workspace = self.config.require_workspace()?;
        self.build(HttpMethod::Get, schema::entries(workspace), None::<&()>, &[])
    }

    pub fn parse_list_entries(&self, response: HttpResponse) -> Result<Vec<Entry>> {
        decode(&check_status(response)?)
    }

    /// Entries of the configured workspace, with their commits.
    pub fn list_entries(&self) -> Result<Vec<Entry>> {
        let request = self.build_list_entries()?;
        decode(&self.send(&request)?)
    }

    /// Ids of the entries in the configured workspace.
    pub fn entry_ids(&self) -> Result<Vec<String>> {
        Ok(self.list_entries()?.into_iter().map(|e| e.id).collect())
    }

    // ---------------------------------------------------------------------------
    // Commits
    // ---------------------------------------------------------------------------

    pub fn build_create_commit(&self, entry_id: &str, data: &Value, title: &str) -> Result<HttpRequest> {
        let workspace = self.config.require_workspace()?;
        let body = NewCommit::tool(data, title);
        self.build(HttpMethod::Post, schema::commit(workspace, entry_id), Some(&body), &[])
    }

    pub fn parse_create_commit(&self, response: HttpResponse) -> Result<Commit> {
        decode(&check_status(response)?)
    }

    /// Attach `data` to `entry_id` as a `tool` commit.
    pub fn create_commit(&self, entry_id: &str, data: &Value, title: &str) -> Result<Commit> {
        let request = self.build_create_commit(entry_id, data, title)?;
        decode(&self.send(&request)?)
    }

    // ---------------------------------------------------------------------------
    // Generic query
    // ---------------------------------------------------------------------------

    pub fn build_graphql(&self, query: &str, variables: Option<&Map<String, Value>>) -> Result<HttpRequest> {
        let body = GraphQlRequest { query, variables };
        self.build_request(HttpMethod::Post, schema::GRAPHQL, Some(&body), &[])
    }

    pub fn parse_graphql(&self, response: HttpResponse) -> Result<GraphQlResponse> {
        decode(&check_status(response)?)
    }

    /// Run an arbitrary query. Server-side query errors are left in the
    /// envelope's `error` field for the caller to inspect.
    pub fn graphql(&self, query: &str, variables: Option<&Map<String, Value>>) -> Result<GraphQlResponse> {
        let request = self.build_graphql(query, variables)?;
        decode(&self.send(&request)?)
    }

    /// The `data` payload stored on one commit.
    pub fn commit_data(&self, commit_id: &str) -> Result<Value> {
        let mut variables = Map::new();
        variables.insert("commit_id".to_string(), Value::String(commit_id.to_string()));
        let response = self.graphql(COMMIT_DATA_QUERY, Some(&variables))?;
        extract_commit_data(response)
    }
}

/// Split a response into its body or an `Error::Api` carrying that body.
pub fn check_status(response: HttpResponse) -> Result<Vec<u8>> {
    if response.status < FIRST_ERROR_STATUS {
        return Ok(response.body);
    }
    Err(Error::Api {
        status: response.status,
        body: response.body,
    })
}

fn decode<D: DeserializeOwned>(bytes: &[u8]) -> Result<D> {
    serde_json::from_slice(bytes).map_err(Error::decoding)
}

fn extract_commit_data(response: GraphQlResponse) -> Result<Value> {
    if let Some(error) = response.error.filter(|e| !e.is_null()) {
        return Err(Error::Decoding(format!("query returned an error: {error}")));
    }
    let mut data = response.data;
    match data.remove("commit") {
        Some(Value::Object(mut commit)) => commit
            .remove("data")
            .ok_or_else(|| Error::Decoding("missing field `data.commit.data`".to_string())),
        Some(Value::Null) | None => Err(Error::Decoding("missing field `data.commit`".to_string())),
        Some(other) => Err(Error::Decoding(format!("`data.commit` is not an object: {other}"))),
    }
}
