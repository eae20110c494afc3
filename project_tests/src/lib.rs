//! # Synthetic Store Backend
//!
//! An in-process HTTP server standing in for the checkin, auth, `fdfe` and
//! payload hosts. Tests script replies per path prefix and then inspect every
//! request the client sent.
//!
//! ## Contained Modules:
//! - **`replies`**: Builders for the protobuf and form bodies the backend answers with.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use lib_playstore::StoreConfig;
use lib_playstore::configs::{EndpointConfig, RetryConfig};

/// Reply bodies in the store's formats.
pub mod replies;

/// One scripted answer.
#[derive(Debug, Clone)]
pub struct Reply {
    /// HTTP status.
    pub status: u16,
    /// Raw response body.
    pub body: Bytes,
    /// Held back this long before the response head is written.
    pub delay: Option<Duration>,
}

impl Reply {
    /// A 200 with `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: None,
        }
    }

    /// An empty body with `status`.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Bytes::new(),
            delay: None,
        }
    }

    /// Hold the reply back for `delay`.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// A request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// HTTP method.
    pub method: Method,
    /// Path and query, e.g. `/fdfe/details?doc=com.a`.
    pub target: String,
    /// Request headers as received.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Bytes,
    /// Arrival time.
    pub at: Instant,
}

impl Recorded {
    /// A header value, when present and valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body decoded as lossy UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

struct Route {
    prefix: String,
    replies: VecDeque<Reply>,
}

#[derive(Default)]
struct MockState {
    routes: Vec<Route>,
    log: Vec<Recorded>,
}

type Shared = Arc<Mutex<MockState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockState> {
    // A panicking test thread must not hide the requests from the others.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A running synthetic backend; stops when dropped.
pub struct MockBackend {
    base: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind an ephemeral localhost port and start serving.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "mock backend stopped");
            }
        });
        tracing::debug!(%addr, "mock backend listening");
        Self {
            base: format!("http://{}", addr),
            state,
            server,
        }
    }

    /// `http://127.0.0.1:<port>`.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Absolute URL of `path` on this backend.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Queue `reply` for requests whose path and query start with `prefix`.
    ///
    /// The longest matching prefix wins. Queued replies are served in order
    /// and the last one keeps answering. Unmatched requests get a 404.
    pub fn on(&self, prefix: &str, reply: Reply) -> &Self {
        let mut state = lock(&self.state);
        match state.routes.iter_mut().find(|r| r.prefix == prefix) {
            Some(route) => route.replies.push_back(reply),
            None => state.routes.push(Route {
                prefix: prefix.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
        self
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.state).log.clone()
    }

    /// Requests whose target starts with `prefix`.
    pub fn requests_to(&self, prefix: &str) -> Vec<Recorded> {
        lock(&self.state)
            .log
            .iter()
            .filter(|r| r.target.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of requests whose target starts with `prefix`.
    pub fn hits(&self, prefix: &str) -> usize {
        self.requests_to(prefix).len()
    }

    /// Client config pointing every endpoint here, with the throttle off and
    /// short backoffs.
    pub fn config(&self) -> StoreConfig {
        let mut config = StoreConfig::default();
        config.endpoints = EndpointConfig::rooted_at(&self.base);
        config.throttle.enabled = false;
        config.retry = RetryConfig {
            max_retries: 2,
            min_backoff_ms: 10,
            max_backoff_ms: 20,
        };
        config
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn handle(
    State(state): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let reply = {
        let mut state = lock(&state);
        state.log.push(Recorded {
            method,
            target: target.clone(),
            headers,
            body,
            at: Instant::now(),
        });
        state
            .routes
            .iter_mut()
            .filter(|r| target.starts_with(&r.prefix))
            .max_by_key(|r| r.prefix.len())
            .and_then(|route| {
                if route.replies.len() > 1 {
                    route.replies.pop_front()
                } else {
                    route.replies.front().cloned()
                }
            })
    };

    match reply {
        Some(reply) => {
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            let status =
                StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, reply.body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Route client logs to the test harness. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lib_playstore=debug")
        .with_test_writer()
        .try_init();
}
