// Shared helpers for the integration tests; not every test file uses all of them.
#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use itmo_answer::admission::AdmissionController;
use itmo_answer::api::AppState;
use itmo_answer::completion::CompletionClient;
use itmo_answer::orchestrator::Orchestrator;
use itmo_answer::search::SearchClient;

pub const FOLDER_ID: &str = "b1gtestfolder";
pub const SEARCH_KEY: &str = "search-secret";
pub const COMPLETION_KEY: &str = "gpt-secret";

/// Canned behavior of the fake search and completion services.
#[derive(Clone)]
pub struct MockConfig {
    pub search_status: StatusCode,
    pub search_body: String,
    pub search_delay: Duration,
    pub completion_status: StatusCode,
    pub completion_body: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            search_status: StatusCode::OK,
            search_body: search_body(
                "ИТМО основан в 1900 году как ремесленное училище.",
                &["История ИТМО"],
                &["https://itmo.ru/history", "https://itmo.ru/about"],
            ),
            search_delay: Duration::ZERO,
            completion_status: StatusCode::OK,
            completion_body: completion_body("1900 — ITMO was founded as a school of..."),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub folder_id: Option<String>,
    pub body: Value,
}

#[derive(Default)]
pub struct MockStats {
    pub search_hits: AtomicUsize,
    pub completion_hits: AtomicUsize,
    pub active_searches: AtomicUsize,
    pub max_active_searches: AtomicUsize,
    pub last_search: Mutex<Option<RecordedCall>>,
    pub last_completion: Mutex<Option<RecordedCall>>,
}

struct MockState {
    config: MockConfig,
    stats: Arc<MockStats>,
}

/// Fake upstream serving both the search and completion endpoints.
pub struct MockUpstream {
    pub base_url: String,
    pub stats: Arc<MockStats>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start(config: MockConfig) -> Self {
        let stats = Arc::new(MockStats::default());
        let state = Arc::new(MockState {
            config,
            stats: stats.clone(),
        });

        let app = Router::new()
            .route("/search/xml/generative", post(mock_search))
            .route("/foundationModels/v1/completion", post(mock_completion))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            stats,
            handle,
        }
    }

    pub fn search_hits(&self) -> usize {
        self.stats.search_hits.load(Ordering::SeqCst)
    }

    pub fn completion_hits(&self) -> usize {
        self.stats.completion_hits.load(Ordering::SeqCst)
    }

    pub fn max_active_searches(&self) -> usize {
        self.stats.max_active_searches.load(Ordering::SeqCst)
    }

    pub fn last_search(&self) -> Option<RecordedCall> {
        self.stats.last_search.lock().unwrap().clone()
    }

    pub fn last_completion(&self) -> Option<RecordedCall> {
        self.stats.last_completion.lock().unwrap().clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn record(headers: &HeaderMap, folder_id: Option<String>, body: &Bytes) -> RecordedCall {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    RecordedCall {
        authorization: header("authorization"),
        accept: header("accept"),
        folder_id,
        body: serde_json::from_slice(body).unwrap_or(Value::Null),
    }
}

fn json_response(status: StatusCode, body: String) -> Response {
    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

async fn mock_search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let stats = &state.stats;
    stats.search_hits.fetch_add(1, Ordering::SeqCst);
    let active = stats.active_searches.fetch_add(1, Ordering::SeqCst) + 1;
    stats.max_active_searches.fetch_max(active, Ordering::SeqCst);
    *stats.last_search.lock().unwrap() =
        Some(record(&headers, params.get("folderid").cloned(), &body));

    if !state.config.search_delay.is_zero() {
        tokio::time::sleep(state.config.search_delay).await;
    }
    stats.active_searches.fetch_sub(1, Ordering::SeqCst);

    json_response(state.config.search_status, state.config.search_body.clone())
}

async fn mock_completion(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.stats.completion_hits.fetch_add(1, Ordering::SeqCst);
    *state.stats.last_completion.lock().unwrap() = Some(record(&headers, None, &body));
    json_response(
        state.config.completion_status,
        state.config.completion_body.clone(),
    )
}

pub fn search_body(content: &str, titles: &[&str], links: &[&str]) -> String {
    json!({
        "message": {"content": content, "role": "assistant"},
        "titles": titles,
        "links": links,
    })
    .to_string()
}

pub fn completion_body(text: &str) -> String {
    json!({
        "result": {
            "alternatives": [{"message": {"role": "assistant", "text": text}, "status": "ALTERNATIVE_STATUS_FINAL"}],
            "modelVersion": "23.10.2024"
        }
    })
    .to_string()
}

/// A base URL nothing listens on.
pub fn unreachable_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub fn build_orchestrator(search_base: &str, completion_base: &str) -> Orchestrator {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let search = SearchClient::new(http.clone(), search_base, FOLDER_ID, SEARCH_KEY.into());
    let completion = CompletionClient::new(
        http,
        completion_base,
        FOLDER_ID,
        "yandexgpt",
        COMPLETION_KEY.into(),
    );
    Orchestrator::new(search, completion)
}

pub fn build_state(
    search_base: &str,
    completion_base: &str,
    max_concurrent: usize,
    max_queued: Option<usize>,
) -> AppState {
    AppState::new(
        AdmissionController::new(max_concurrent, max_queued, Duration::ZERO),
        build_orchestrator(search_base, completion_base),
    )
}

pub fn answer_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/request")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

/// Polls `condition` until it holds or a couple of seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
