//! Tests for the nginx auth_http adapter and the HTTP backend client.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use lookup_gateway::backend::{Backend, BackendError, HttpBackend};
use lookup_gateway::config::{BackendConfig, HttpListenerConfig};
use lookup_gateway::http::{HttpListener, HttpServer};
use lookup_gateway::lifecycle::Shutdown;
use lookup_gateway::{Query, Status, Value};
use serde_json::json;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tower::ServiceExt;

mod common;

fn auth_request(user: &str) -> Request<Body> {
    Request::builder()
        .uri("/mail/auth")
        .header("Auth-Method", "plain")
        .header("Auth-User", user)
        .header("Auth-Pass", "secret")
        .header("Auth-Protocol", "imap")
        .header("Auth-Login-Attempt", "1")
        .header("Client-IP", "192.0.2.7")
        .body(Body::empty())
        .unwrap()
}

fn server() -> (HttpServer, std::sync::Arc<common::ScriptedBackend>) {
    let backend = common::ScriptedBackend::new();
    let server = HttpServer::new(&HttpListenerConfig::default(), std::sync::Arc::clone(&backend));
    (server, backend)
}

async fn raw_get(path: &std::path::Path, user: &str) -> String {
    let mut stream = UnixStream::connect(path).await.unwrap();
    let request = format!(
        "GET /auth HTTP/1.1\r\nHost: localhost\r\nAuth-User: {}\r\nAuth-Protocol: smtp\r\nConnection: close\r\n\r\n",
        user
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut out = String::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut out))
        .await
        .expect("response in time")
        .unwrap();
    out.to_ascii_lowercase()
}

#[tokio::test]
async fn accepted_login_returns_upstream() {
    let (server, backend) = server();

    let res = server.router().oneshot(auth_request("bob")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["auth-status"], "OK");
    assert_eq!(res.headers()["auth-server"], "10.0.0.1");
    assert_eq!(res.headers()["auth-port"], "143");
    assert!(res.headers().contains_key("x-request-id"));

    let queries = backend.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].verb, "nginx");
    assert_eq!(
        queries[0].object,
        Value::fields([
            ("user", "bob"),
            ("pass", "secret"),
            ("protocol", "imap"),
            ("attempt", "1"),
            ("client", "192.0.2.7"),
        ])
    );
}

#[tokio::test]
async fn rejected_login_asks_client_to_wait() {
    let (server, _) = server();

    let res = server.router().oneshot(auth_request("missing")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["auth-status"], "Invalid login or password");
    assert_eq!(res.headers()["auth-wait"], "5");
}

#[tokio::test]
async fn backend_failures_are_server_errors() {
    let (server, _) = server();

    let res = server.router().oneshot(auth_request("broken")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.headers().get("auth-status").is_none());

    let res = server.router().oneshot(auth_request("boom")).await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Requests after a panic are still served.
    let res = server.router().oneshot(auth_request("bob")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn serves_over_unix_socket_until_shutdown() {
    let dir = TempDir::new().unwrap();
    let path = common::socket_path(&dir, "auth");
    let (server, _) = server();
    let shutdown = Shutdown::new();

    let listener = HttpListener::bind_unix(&path).unwrap();
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let response = raw_get(&path, "bob").await;
    assert!(response.starts_with("http/1.1 200"), "{}", response);
    assert!(response.contains("auth-status: ok"));
    assert!(response.contains("auth-server: 10.0.0.1"));

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server stops")
        .unwrap();
    assert!(result.is_ok());
    assert!(!path.exists());
}

#[tokio::test]
async fn gateway_starts_http_listener_from_config() {
    let dir = TempDir::new().unwrap();
    let mut config = lookup_gateway::GatewayConfig::default();
    config.http.enabled = true;
    config.http.socket_path = Some(common::socket_path(&dir, "http"));
    let path = config.http.socket_path.clone().unwrap();
    let gw = common::start_gateway(dir, config).await;

    let response = raw_get(&path, "missing").await;
    assert!(response.contains("auth-status: invalid login or password"), "{}", response);
    assert!(response.contains("auth-wait: 5"));

    gw.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), gw.running.wait(Duration::from_secs(1)))
        .await
        .expect("gateway stops");
    assert!(result.is_ok());
}

fn backend_for(url: String) -> HttpBackend {
    HttpBackend::new(&BackendConfig { url, timeout_secs: 5 }).unwrap()
}

#[tokio::test]
async fn http_backend_posts_query_and_decodes_reply() {
    let (url, seen) = common::start_mock_service(200, json!({"status": "OK", "data": "relay:[mx.example.org]"})).await;
    let backend = backend_for(url);

    let query = Query::new("transport", Value::Text("example.org".into()));
    let response = backend.request(&query).await.unwrap();
    assert_eq!(response.status, Status::Found);
    assert_eq!(response.data, Value::Text("relay:[mx.example.org]".into()));
    assert_eq!(seen.lock().unwrap().as_slice(), [query]);
}

#[tokio::test]
async fn http_backend_defaults_missing_data() {
    let (url, _) = common::start_mock_service(200, json!({"status": "KO"})).await;
    let response = backend_for(url)
        .request(&Query::new("virtual", Value::Text("nobody@example.org".into())))
        .await
        .unwrap();
    assert_eq!(response.status, Status::NotFound);
    assert_eq!(response.data, Value::default());

    let (url, _) = common::start_mock_service(200, json!({"status": "MAYBE", "data": {}})).await;
    let response = backend_for(url)
        .request(&Query::new("virtual", Value::Text("x".into())))
        .await
        .unwrap();
    assert_eq!(response.status, Status::Unknown);

    let (url, _) = common::start_mock_service(200, json!({"status": "KO", "data": null})).await;
    let response = backend_for(url)
        .request(&Query::new("virtual", Value::Text("x".into())))
        .await
        .unwrap();
    assert_eq!(response.status, Status::NotFound);
    assert_eq!(response.data, Value::Other(serde_json::Value::Null));
}

#[tokio::test]
async fn http_backend_reports_failures() {
    let (url, _) = common::start_mock_service(503, json!({"error": "down"})).await;
    let query = Query::new("virtual", Value::Text("x".into()));
    assert!(matches!(
        backend_for(url).request(&query).await,
        Err(BackendError::Status(503))
    ));

    let (url, _) = common::start_mock_service(200, json!("not a response")).await;
    assert!(matches!(
        backend_for(url).request(&query).await,
        Err(BackendError::Decode(_))
    ));

    // Reserved port with nothing listening.
    let backend = backend_for("http://127.0.0.1:9/lookup".to_string());
    assert!(matches!(backend.request(&query).await, Err(BackendError::Transport(_))));
}
