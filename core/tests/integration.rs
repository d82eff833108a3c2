//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `MixtoClient` with
//! the default ureq transport over real HTTP. Validates that URL joining,
//! headers, status classification and decoding agree with the server.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use mixto_core::{Config, Error, HttpMethod, MixtoClient, Transport, UreqTransport};
use serde_json::json;

/// Start the mock server on a random port and return its address.
fn spawn_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

/// Serve one connection with a canned raw HTTP response.
fn spawn_raw_server(response: &'static [u8]) -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(response).unwrap();
    });

    addr
}

fn client(addr: SocketAddr, workspace: &str) -> MixtoClient {
    MixtoClient::new(Config::new(format!("http://{addr}"), mock_server::API_KEY, workspace))
}

#[test]
fn commit_lifecycle() {
    let addr = spawn_server();
    let client = client(addr, "w1");

    // Step 1: workspaces come back in server order.
    let workspaces = client.list_workspaces().unwrap();
    let ids: Vec<&str> = workspaces.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(ids, ["w1", "w2"]);
    assert_eq!(workspaces[0].commit_count, 0);

    // Step 2: entries of the configured workspace, no commits yet.
    assert_eq!(client.entry_ids().unwrap(), ["e1", "e2"]);

    // Step 3: create a commit.
    let data = json!({"host": "10.0.0.5", "ports": [22, 443]});
    let commit = client.create_commit("e2", &data, "nmap sweep").unwrap();
    assert_eq!(commit.title, "nmap sweep");
    assert_eq!(commit.commit_type, "tool");
    assert!(!commit.id.is_empty());

    // Step 4: the entry now carries it.
    let entries = client.list_entries().unwrap();
    let e2 = entries.iter().find(|e| e.id == "e2").unwrap();
    assert_eq!(e2.commits.len(), 1);
    assert_eq!(e2.commits[0], commit);

    // Step 5: stored data is reachable through the generic query endpoint.
    assert_eq!(client.commit_data(&commit.id).unwrap(), data);

    // Step 6: workspace counters reflect the new commit.
    let workspaces = client.list_workspaces().unwrap();
    assert_eq!(workspaces[0].commit_count, 1);
}

#[test]
fn server_errors_keep_their_body() {
    let addr = spawn_server();

    let err = client(addr, "w1")
        .create_commit("nope", &json!("x"), "t")
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.body_text().as_deref(), Some("entry nope not found in w1"));

    let err = client(addr, "missing").list_entries().unwrap_err();
    match err {
        Error::Api { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, b"workspace missing not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[test]
fn wrong_key_is_an_auth_error() {
    let addr = spawn_server();
    let client = MixtoClient::new(Config::new(format!("http://{addr}"), "wrong-key", "w1"));

    let err = client.list_workspaces().unwrap_err();
    assert!(err.is_auth_error());
    assert!(!err.to_string().contains("wrong-key"));
}

#[test]
fn unsupported_query_is_left_in_envelope() {
    let addr = spawn_server();
    let resp = client(addr, "w1").graphql("{ users { id } }", None).unwrap();
    assert!(resp.data.is_empty());
    assert_eq!(resp.error, Some(json!("unsupported query")));
}

#[test]
fn raw_request_returns_bytes_unparsed() {
    let addr = spawn_server();
    let bytes = client(addr, "w1")
        .request::<()>("get".parse::<HttpMethod>().unwrap(), "/api/misc/workspaces/w2", None, &[])
        .unwrap();
    assert_eq!(bytes, b"[]");
}

#[test]
fn unknown_route_is_api_error() {
    let addr = spawn_server();
    let err = client(addr, "w1")
        .request::<()>(HttpMethod::Get, "/api/v1/workspace", None, &[])
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[test]
fn connection_refused_is_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let client = client(addr, "w1").with_timeout(Duration::from_secs(2));

    let err = client.list_workspaces().unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[test]
fn one_client_serves_many_threads() {
    let addr = spawn_server();
    let client = client(addr, "w1");

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let client = &client;
                s.spawn(move || client.create_commit("e1", &json!(i), &format!("worker {i}")))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
    });

    let entries = client.list_entries().unwrap();
    assert_eq!(entries[0].commits.len(), 4);
}

#[test]
fn large_bodies_are_returned_in_full() {
    let addr = spawn_server();
    let client = client(addr, "w1");

    // Above ureq's default 10 MB read cap.
    let data = json!("a".repeat(11 * 1024 * 1024));
    let commit = client.create_commit("e1", &data, "big dump").unwrap();
    assert_eq!(client.commit_data(&commit.id).unwrap(), data);
}

#[test]
fn body_limit_is_configurable() {
    let addr = spawn_server();
    let config = Config::new(format!("http://{addr}"), mock_server::API_KEY, "w1");
    let client = MixtoClient::with_transport(config, UreqTransport::new().with_body_limit(16));

    let err = client.list_workspaces().unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[test]
fn non_ascii_header_values_are_kept() {
    let addr = spawn_raw_server(
        b"HTTP/1.1 200 OK\r\nX-Case-Owner: Ren\xe9e\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
    );
    let config = Config::new(format!("http://{addr}"), "k", "w1");
    let request = MixtoClient::with_transport(config, UreqTransport::new())
        .build_request::<()>(HttpMethod::Get, "/anything", None, &[])
        .unwrap();

    let response = UreqTransport::new().execute(&request).unwrap();
    let owner = response
        .headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("x-case-owner"))
        .map(|(_, v)| v.as_str());
    assert_eq!(owner, Some("Ren\u{fffd}e"));
    assert_eq!(response.body, b"ok");
}
