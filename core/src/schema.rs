//! Endpoint paths of the canonical wire schema.
//!
//! Earlier server generations used `/api/v1/...` paths with `workspace_id`
//! body fields; only the latest revision is supported.

/// Wire-schema revision this client speaks.
pub const REVISION: u32 = 3;

pub const WORKSPACES: &str = "/api/workspace";
pub const GRAPHQL: &str = "/api/gql";

/// `GET` path listing the entries of `workspace`, as raw segments.
pub fn entries(workspace: &str) -> [&str; 4] {
    ["api", "misc", "workspaces", workspace]
}

/// `POST` path creating a commit on `entry_id` inside `workspace`.
pub fn commit<'a>(workspace: &'a str, entry_id: &'a str) -> [&'a str; 5] {
    ["api", "entry", workspace, entry_id, "commit"]
}
