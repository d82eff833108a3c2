//! Synchronous client for the Mixto case-management API.
//!
//! # Overview
//! Workspaces hold entries; entries accumulate commits. `MixtoClient`
//! authenticates with an API key, joins endpoint paths onto a configurable
//! host, encodes JSON bodies and decodes JSON responses into typed values.
//!
//! # Design
//! - `MixtoClient` is stateless apart from its immutable `Config`; calls are
//!   independent and may run concurrently from several threads.
//! - All I/O sits behind the `Transport` trait. `UreqTransport` is the
//!   blocking default; tests substitute a recording fake.
//! - Only the latest wire schema is spoken (see `schema`).
//! - Statuses of 301 and above become `Error::Api`, which keeps the raw
//!   server body.
//!
//! ```no_run
//! use mixto_core::{Config, MixtoClient};
//!
//! # fn main() -> mixto_core::Result<()> {
//! let client = MixtoClient::new(Config::load()?);
//! for entry in client.list_entries()? {
//!     println!("{} {}", entry.id, entry.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod schema;
pub mod transport;
pub mod types;

pub use client::MixtoClient;
pub use config::Config;
pub use error::{Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{Commit, Entry, GraphQlResponse, Workspace};
