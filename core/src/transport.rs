//! The I/O seam between `MixtoClient` and the network.
//!
//! # Design
//! `Transport` executes one `HttpRequest` and returns the response as data,
//! whatever its status. Status classification stays in the client, so a
//! transport never turns a 4xx/5xx into an error; it only fails for
//! network-level problems (DNS, refused connection, timeout).
//!
//! `UreqTransport` is the blocking default. A single `ureq::Agent` pools
//! connections and is safe to share across threads.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Upper bound applied when neither the agent nor the request sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes HTTP round trips for `MixtoClient`.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a pooled `ureq::Agent`.
///
/// Response bodies are read in full by default; `with_body_limit` caps them.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    body_limit: u64,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Agent-wide deadline. A request's own `timeout` takes precedence.
    pub fn with_timeout(timeout: Duration) -> Self {
        // Status codes are data here; the client decides what is an error.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            body_limit: u64::MAX,
        }
    }

    /// Largest response body accepted, in bytes. Larger bodies fail with
    /// `Error::Transport`.
    pub fn with_body_limit(mut self, limit: u64) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match (request.method, body) {
            (HttpMethod::Get, None) => prepare(self.agent.get(url), request).call(),
            (HttpMethod::Delete, None) => prepare(self.agent.delete(url), request).call(),
            (HttpMethod::Get, Some(bytes)) => {
                prepare(self.agent.get(url), request).force_send_body().send(bytes)
            }
            (HttpMethod::Delete, Some(bytes)) => {
                prepare(self.agent.delete(url), request).force_send_body().send(bytes)
            }
            (HttpMethod::Post, Some(bytes)) => prepare(self.agent.post(url), request).send(bytes),
            (HttpMethod::Post, None) => prepare(self.agent.post(url), request).send_empty(),
            (HttpMethod::Put, Some(bytes)) => prepare(self.agent.put(url), request).send(bytes),
            (HttpMethod::Put, None) => prepare(self.agent.put(url), request).send_empty(),
            (HttpMethod::Patch, Some(bytes)) => prepare(self.agent.patch(url), request).send(bytes),
            (HttpMethod::Patch, None) => prepare(self.agent.patch(url), request).send_empty(),
        };
        let mut response = result.map_err(|e| Error::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.body_limit)
            .read_to_vec()
            .map_err(|e| Error::Transport(Box::new(e)))?;

        Ok(HttpResponse { status, headers, body })
    }
}

/// Copy headers and the per-request deadline onto a ureq builder.
fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = request.timeout {
        builder = builder.config().timeout_global(Some(timeout)).build();
    }
    builder
}
