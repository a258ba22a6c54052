//! Integration test support for the TechHub storefront client.
//!
//! [`MockBackend`] is an in-process `axum` server standing in for the TechHub
//! REST API. Tests script responses per method and path, point an
//! `HttpBackend` (or a whole `Storefront`) at it, and inspect the requests it
//! received.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p techhub-integration-tests
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use techhub_storefront::config::StorefrontConfig;

/// Path prefix the mock serves under, mirroring the real API's version root.
pub const API_ROOT: &str = "/api/v1";

/// One scripted reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
    pub retry_after: Option<u64>,
}

impl Reply {
    #[must_use]
    pub const fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            retry_after: None,
        }
    }

    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    #[must_use]
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            status: 429,
            body: json!({ "message": "Too many requests" }),
            retry_after: Some(retry_after),
        }
    }
}

/// A request as the mock received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path below [`API_ROOT`], still percent-encoded.
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    /// Parsed JSON body, `Value::Null` when empty.
    pub body: Value,
}

#[derive(Default)]
struct Script {
    replies: HashMap<(Method, String), VecDeque<Reply>>,
    received: Vec<Recorded>,
}

type Shared = Arc<Mutex<Script>>;

/// In-process stand-in for the TechHub API, bound to an ephemeral port.
///
/// The server task is aborted on drop.
pub struct MockBackend {
    base_url: Url,
    script: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind `127.0.0.1:0` and start serving.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let script = Shared::default();
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&script));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}{API_ROOT}"))
            .map_err(std::io::Error::other)?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            script,
            server,
        })
    }

    /// API root to configure the client with.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Default configuration pointed at this server, with short timings.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let mut config = StorefrontConfig {
            api_base_url: self.base_url(),
            checkout_settle: Duration::from_millis(10),
            request_timeout: Duration::from_secs(5),
            ..StorefrontConfig::default()
        };
        config.cart.debounce = Duration::from_millis(50);
        config.cart.rate_limit_backoff = Duration::from_millis(20);
        config
    }

    /// Queue a reply for `method path` (path below [`API_ROOT`], no query).
    ///
    /// Replies are served in order; the last one keeps being served.
    pub fn on(&self, method: Method, path: &str, reply: Reply) {
        self.with_script(|s| {
            s.replies
                .entry((method, path.to_string()))
                .or_default()
                .push_back(reply);
        });
    }

    /// Every request received so far.
    #[must_use]
    pub fn received(&self) -> Vec<Recorded> {
        self.with_script(|s| s.received.clone())
    }

    /// Requests received for `method path`.
    #[must_use]
    pub fn received_for(&self, method: &Method, path: &str) -> Vec<Recorded> {
        self.received()
            .into_iter()
            .filter(|r| &r.method == method && r.path == path)
            .collect()
    }

    fn with_script<T>(&self, f: impl FnOnce(&mut Script) -> T) -> T {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut script)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(script): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path()
        .strip_prefix(API_ROOT)
        .unwrap_or_else(|| uri.path())
        .to_string();

    let recorded = Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };

    let reply = {
        let mut script = script.lock().unwrap_or_else(PoisonError::into_inner);
        script.received.push(recorded);
        script
            .replies
            .get_mut(&(method, path))
            .and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
    };

    let Some(reply) = reply else {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "success": false, "message": "Route not found" })),
        )
            .into_response();
    };

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, axum::Json(reply.body)).into_response();
    if let Some(seconds) = reply.retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
    }
    response
}
