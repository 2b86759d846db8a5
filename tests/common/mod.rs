//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{routing::post, Json, Router};
use lookup_gateway::config::GatewayConfig;
use lookup_gateway::lifecycle::{self, Running, Shutdown};
use lookup_gateway::transport::{FrameCodec, Framing};
use lookup_gateway::{Backend, BackendError, Query, Response, StreamProtocol, Value};
use tempfile::TempDir;
use tokio::net::{TcpListener, UnixStream};
use tokio_util::codec::Framed;

/// In-process backend driven by the lookup key.
///
/// - `missing` resolves negatively
/// - `broken` fails the call
/// - `boom` panics inside the call
/// - `slow` answers after a delay
/// - anything else resolves to a value derived from the key
#[derive(Default)]
pub struct ScriptedBackend {
    queries: Mutex<Vec<Query>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every query received so far, in arrival order.
    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }
}

fn lookup_key(object: &Value) -> String {
    match object {
        Value::Text(key) => key.clone(),
        map => map
            .str_field("object")
            .or_else(|| map.str_field("user"))
            .unwrap_or_default()
            .to_string(),
    }
}

impl Backend for ScriptedBackend {
    async fn request(&self, query: &Query) -> Result<Response, BackendError> {
        self.queries.lock().unwrap().push(query.clone());
        let key = lookup_key(&query.object);

        match key.as_str() {
            "missing" => return Ok(Response::not_found(Value::default())),
            "broken" => return Err(BackendError::Unavailable("scripted failure".into())),
            "boom" => panic!("scripted panic"),
            "slow" => tokio::time::sleep(Duration::from_millis(300)).await,
            _ => {}
        }

        Ok(match &query.object {
            Value::Text(_) => Response::found(Value::Text(format!("{}:{}", query.verb, key))),
            _ => Response::found(Value::fields([
                ("uid", key.as_str()),
                ("host", "10.0.0.1"),
                ("port", "143"),
            ])),
        })
    }
}

/// A gateway started from config inside a temporary directory.
pub struct TestGateway {
    pub dir: TempDir,
    pub config: GatewayConfig,
    pub backend: Arc<ScriptedBackend>,
    pub shutdown: Shutdown,
    pub running: Running,
}

impl TestGateway {
    pub fn socket(&self, protocol: StreamProtocol) -> &Path {
        self.config
            .stream(protocol)
            .socket_path
            .as_deref()
            .expect("listener has a socket path")
    }
}

/// Config with one stream listener bound under `dir`.
pub fn stream_config(dir: &TempDir, protocol: StreamProtocol, framing: Option<Framing>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    let listener = match protocol {
        StreamProtocol::Socketmap => &mut config.socketmap,
        StreamProtocol::Dict => &mut config.dict,
    };
    listener.enabled = true;
    listener.socket_path = Some(socket_path(dir, protocol.name()));
    listener.framing = framing;
    listener.accept_timeout_ms = 50;
    config.drain_timeout_secs = 2;
    config
}

pub fn socket_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(format!("{}.sock", name))
}

/// Start the gateway for `config` against a fresh scripted backend.
pub async fn start_gateway(dir: TempDir, config: GatewayConfig) -> TestGateway {
    let backend = ScriptedBackend::new();
    let shutdown = Shutdown::new();
    let running = lifecycle::start(&config, Arc::clone(&backend), &shutdown)
        .await
        .expect("gateway starts");
    TestGateway {
        dir,
        config,
        backend,
        shutdown,
        running,
    }
}

/// Connect a framed client to a stream listener.
pub async fn connect(path: &Path, framing: Framing) -> Framed<UnixStream, FrameCodec> {
    let stream = UnixStream::connect(path).await.expect("socket reachable");
    Framed::new(stream, framing.codec(100_000))
}

/// Start a lookup service answering every query with `reply`, returning its URL.
///
/// `status` is the HTTP status code the service answers with.
pub async fn start_mock_service(status: u16, reply: serde_json::Value) -> (String, Arc<Mutex<Vec<Query>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);
    let app = Router::new().route(
        "/lookup",
        post(move |Json(query): Json<Query>| {
            let recorded = Arc::clone(&recorded);
            let reply = reply.clone();
            async move {
                recorded.lock().unwrap().push(query);
                let status = axum::http::StatusCode::from_u16(status).unwrap();
                (status, Json(reply))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{}/lookup", addr), seen)
}
