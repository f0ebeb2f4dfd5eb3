#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use kidstory_core::chat::{ChatMessage, ChatRole};
use kidstory_core::upstream::UpstreamError;
use kidstory_jobs::{ImageJobService, JobsConfig};
use kidstory_openai::{ChatCompleter, ImageGenerator};
use serde_json::Value;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use kidstory_api::config::ServerConfig;
use kidstory_api::router::build_app_router;
use kidstory_api::state::AppState;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const FAKE_IMAGE_URL: &str = "https://images.test/fox.png";

/// Build a test `ServerConfig` with safe defaults.
///
/// The pacer interval is zeroed so tests are not slowed down by spacing;
/// pacing itself is covered in the jobs crate.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        openai_api_key: "test-key".to_string(),
        openai_base_url: "http://127.0.0.1:9".to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        image_size: "1024x1024".to_string(),
        download_max_bytes: 1024,
        jobs: JobsConfig {
            min_call_interval: Duration::ZERO,
            ..JobsConfig::default()
        },
    }
}

// ---------------------------------------------------------------------------
// Fake upstream
// ---------------------------------------------------------------------------

/// Image generator whose calls block until the test opens the gate.
pub struct FakeImages {
    gate: Semaphore,
    calls: AtomicUsize,
    failure: Mutex<Option<UpstreamError>>,
}

impl FakeImages {
    fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Let every current and future call through.
    pub fn open(&self) {
        self.gate.add_permits(1024);
    }

    /// Make subsequent calls fail with `error`.
    pub fn fail_with(&self, error: UpstreamError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for FakeImages {
    async fn generate_image(&self, _prompt: &str, _model: &str) -> Result<String, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await.expect("gate closed");
        match self.failure.lock().unwrap().clone() {
            Some(error) => Err(error),
            None => Ok(FAKE_IMAGE_URL.to_string()),
        }
    }
}

/// Chat completer that echoes the last user message, or fails on demand.
#[derive(Default)]
pub struct FakeChat {
    failure: Mutex<Option<UpstreamError>>,
}

impl FakeChat {
    pub fn fail_with(&self, error: UpstreamError) {
        *self.failure.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl ChatCompleter for FakeChat {
    async fn complete_chat(
        &self,
        _model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChatMessage, UpstreamError> {
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        let last = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatMessage::new(
            ChatRole::Assistant,
            format!("Once upon a time: {last}"),
        ))
    }
}

// ---------------------------------------------------------------------------
// Test app
// ---------------------------------------------------------------------------

/// The application under test plus handles on its fakes.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub images: Arc<FakeImages>,
    pub chat: Arc<FakeChat>,
}

impl TestApp {
    /// A fresh router sharing this app's state.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers and fake
/// upstream providers.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let images = Arc::new(FakeImages::new());
    let chat = Arc::new(FakeChat::default());

    let state = AppState {
        config: Arc::new(config.clone()),
        images: ImageJobService::new(images.clone(), &config.jobs),
        chat: chat.clone(),
        http: reqwest::Client::new(),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        images,
        chat,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_json_with_headers(app, uri, body, &[]).await
}

pub async fn post_json_with_headers(
    app: Router,
    uri: &str,
    body: Value,
    headers: &[(&str, &str)],
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Submit a prompt and return the job id from the 202 response.
pub async fn submit(app: Router, prompt: &str) -> String {
    let response = post_json(app, "/generate-image", serde_json::json!({ "prompt": prompt })).await;
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    body_json(response).await["jobId"]
        .as_str()
        .expect("jobId must be a string")
        .to_string()
}

/// Poll `/job-status` until the job is no longer processing.
pub async fn wait_for_terminal(test: &TestApp, job_id: &str) -> Value {
    for _ in 0..1000 {
        let response = get(test.app(), &format!("/job-status?id={job_id}")).await;
        let json = body_json(response).await;
        if json["status"] != "processing" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {job_id} never finished");
}
