//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use lead_relay::{RelayConfig, RelayServer, Shutdown};
use tokio::net::TcpListener;

/// A file part as seen by the mock upstream.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct CapturedFile {
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// One request as seen by the mock upstream.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub fields: Vec<(String, String)>,
    pub files: Vec<CapturedFile>,
}

/// A running mock upstream and what it received.
pub struct MockUpstream {
    pub addr: SocketAddr,
    pub requests: Arc<Mutex<Vec<Captured>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}/leads", self.addr)
    }

    pub fn received(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<Captured>>>,
    status: StatusCode,
    body: &'static str,
    delay: Duration,
}

async fn capture(State(state): State<MockState>, mut multipart: Multipart) -> impl IntoResponse {
    let mut captured = Captured::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap_or_default().to_vec();

        if filename.is_some() {
            captured.files.push(CapturedFile {
                field: name,
                filename,
                content_type,
                data,
            });
        } else {
            captured
                .fields
                .push((name, String::from_utf8_lossy(&data).into_owned()));
        }
    }
    state.requests.lock().unwrap().push(captured);

    tokio::time::sleep(state.delay).await;
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body,
    )
}

/// Start a mock upstream that records each upload and answers with a fixed
/// status and body after `delay`.
pub async fn start_mock_upstream(status: u16, body: &'static str, delay: Duration) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let state = MockState {
        requests: requests.clone(),
        status: StatusCode::from_u16(status).unwrap(),
        body,
        delay,
    };
    let app = Router::new().route("/leads", post(capture)).with_state(state);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, requests }
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Relay config staging into `scratch` and forwarding to `upstream_url`
/// (local mode when `None`).
pub fn relay_config(scratch: &Path, upstream_url: Option<String>) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.host = "127.0.0.1".to_string();
    config.uploads.scratch_dir = scratch.display().to_string();
    config.upstream.url = upstream_url;
    config
}

/// Start a relay on an ephemeral port. Keep the returned `Shutdown` alive
/// for the duration of the test.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = RelayServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn scratch_entries(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

/// The form from the lead page: one text attachment plus contact fields.
pub fn lead_form() -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(b"conteudo do lead".to_vec())
        .file_name("teste.txt")
        .mime_str("text/plain")
        .unwrap();
    reqwest::multipart::Form::new()
        .part("files[]", part)
        .text("email", "a@b.com")
        .text("telefone", "119999999")
}
