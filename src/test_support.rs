//! In-process stand-in for the Hero Vault API.
//!
//! Serves canned responses keyed by method and path and records every request
//! it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    content_type: Option<String>,
    body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self::raw(status, "application/json", &body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::raw(status, "text/plain", body)
    }

    pub fn raw(status: u16, content_type: &str, body: &str) -> Self {
        Self {
            status,
            content_type: Some(content_type.to_string()),
            body: body.to_string(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: String::new(),
        }
    }
}

type Routes = HashMap<(String, String), MockResponse>;

#[derive(Clone)]
struct MockState {
    routes: Arc<Routes>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockVault {
    base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: JoinHandle<()>,
}

impl MockVault {
    pub fn builder() -> MockVaultBuilder {
        MockVaultBuilder {
            routes: HashMap::new(),
        }
    }

    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockVault {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub struct MockVaultBuilder {
    routes: Routes,
}

impl MockVaultBuilder {
    /// `path` is matched against the raw (still percent-encoded) request path.
    pub fn route(mut self, method: &str, path: &str, response: MockResponse) -> Self {
        self.routes
            .insert((method.to_string(), path.to_string()), response);
        self
    }

    pub async fn start(self) -> MockVault {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            routes: Arc::new(self.routes),
            requests: requests.clone(),
        };

        let app = Router::new().fallback(handle).with_state(state);
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockVault {
            base_url: format!("http://{}", addr),
            requests,
            server,
        }
    }
}

fn header_value(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn handle(State(state): State<MockState>, request: Request) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let authorization = header_value(request.headers(), header::AUTHORIZATION);
    let content_type = header_value(request.headers(), header::CONTENT_TYPE);
    let bytes = to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query,
        authorization,
        content_type,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });

    let response = state
        .routes
        .get(&(method, path))
        .cloned()
        .unwrap_or_else(|| MockResponse::text(404, "not found"));

    let mut builder = Response::builder().status(StatusCode::from_u16(response.status).unwrap());
    if let Some(content_type) = response.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(response.body)).unwrap()
}
