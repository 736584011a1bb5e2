//! Fake broker management API for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;

/// Base64 of `key:secret`.
pub const EXPECTED_AUTH: &str = "Basic a2V5OnNlY3JldA==";

/// A request as the broker saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

pub type Recorder = Arc<Mutex<Vec<Recorded>>>;

/// Handle to a running fake broker.
pub struct FakeBroker {
    pub base_url: String,
    pub requests: Recorder,
}

impl FakeBroker {
    /// Bind an ephemeral port on 127.0.0.1 and serve in the background.
    pub async fn start() -> Self {
        let requests: Recorder = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .fallback(handle)
            .with_state(requests.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake broker");
        });

        Self {
            base_url: format!("http://{}/api/v5", addr),
            requests,
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}/api/v5", addr)
}

async fn handle(
    State(requests): State<Recorder>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(|q| q.to_string()),
        authorization: authorization.clone(),
        body,
    });

    if authorization.as_deref() != Some(EXPECTED_AUTH) {
        return (
            StatusCode::UNAUTHORIZED,
            r#"{"code":"BAD_API_KEY_OR_SECRET","message":"Check api_key/api_secret"}"#.to_string(),
        );
    }

    let path = uri.path().strip_prefix("/api/v5").unwrap_or(uri.path());
    match (method.as_str(), path) {
        ("GET", "/clients") => (
            StatusCode::OK,
            r#"{"data":[{"clientid":"mqttx_1","connected":true}],"meta":{"page":1,"limit":100,"count":1}}"#
                .to_string(),
        ),
        ("GET", "/clients/abc123") => (
            StatusCode::OK,
            r#"{"clientid":"abc123","username":"alice","connected":true}"#.to_string(),
        ),
        ("GET", p) if p.starts_with("/clients/") => (
            StatusCode::NOT_FOUND,
            r#"{"code":"CLIENTID_NOT_FOUND","message":"Client ID not found"}"#.to_string(),
        ),
        ("DELETE", "/clients/mqttx_1") => (StatusCode::NO_CONTENT, String::new()),
        ("POST", "/publish") => (StatusCode::OK, r#"{"id":"0006149E5B2A1F5A"}"#.to_string()),
        ("GET", "/schema_registry") => (StatusCode::OK, "[]".to_string()),
        ("GET", "/html") => (StatusCode::OK, "<html>maintenance</html>".to_string()),
        ("GET", "/boom") => (
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"message":"internal details"}"#.to_string(),
        ),
        ("GET", "/throttled") => (StatusCode::TOO_MANY_REQUESTS, String::new()),
        ("GET", "/slow") => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::OK, "{}".to_string())
        }
        _ => (
            StatusCode::NOT_FOUND,
            r#"{"code":"NOT_FOUND","message":"Request path not found"}"#.to_string(),
        ),
    }
}
