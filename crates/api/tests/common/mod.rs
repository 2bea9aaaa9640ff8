//! Shared helpers for the API integration tests.
//!
//! [`build_test_app`] wires the real router, control service and websocket
//! manager around a [`FakeWorker`], so tests exercise the same middleware
//! stack production uses without spawning a scraper process.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use hirewatch_api::config::ServerConfig;
use hirewatch_api::router::build_app_router;
use hirewatch_api::state::AppState;
use hirewatch_core::log_entry::LogSink;
use hirewatch_core::monitor::{MonitorConfig, MonitorDefaults};
use hirewatch_core::validation::DEFAULT_HIRING_SITE_PREFIX;
use hirewatch_events::LogBus;
use hirewatch_worker::{Worker, WorkerCommand, WorkerError};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        hiring_site_prefix: DEFAULT_HIRING_SITE_PREFIX.to_string(),
        monitor: MonitorDefaults::default(),
        worker: WorkerCommand::new("true", Vec::new()),
    }
}

// ---------------------------------------------------------------------------
// Fake worker
// ---------------------------------------------------------------------------

/// In-memory [`Worker`] recording what the control service asked of it.
#[derive(Default)]
pub struct FakeWorker {
    running: AtomicBool,
    fail_spawn: bool,
    started: Mutex<Vec<MonitorConfig>>,
    stops: Mutex<usize>,
}

impl FakeWorker {
    /// A worker whose every start fails like a missing executable.
    pub fn failing() -> Self {
        Self {
            fail_spawn: true,
            ..Self::default()
        }
    }

    pub fn started(&self) -> Vec<MonitorConfig> {
        self.started.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        *self.stops.lock().unwrap()
    }

    /// Simulate the run ending on its own.
    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Worker for FakeWorker {
    fn start(&self, config: MonitorConfig, sink: Arc<dyn LogSink>) -> Result<(), WorkerError> {
        if self.fail_spawn {
            return Err(WorkerError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "scraper not found",
            )));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(WorkerError::AlreadyRunning);
        }
        sink.line(&format!("Monitoring started for {}", config.target_url));
        self.started.lock().unwrap().push(config);
        Ok(())
    }

    fn stop(&self) -> Result<(), WorkerError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(WorkerError::NotRunning);
        }
        *self.stops.lock().unwrap() += 1;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Everything a test may want to poke at besides the router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub worker: Arc<FakeWorker>,
}

/// Build the full application router around `worker`.
pub fn build_test_app_with(worker: FakeWorker) -> TestApp {
    let config = test_config();
    let worker = Arc::new(worker);
    let log_bus = Arc::new(LogBus::default());

    let state = AppState::new(config.clone(), worker.clone(), log_bus);
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        worker,
    }
}

/// Build the full application router with an idle [`FakeWorker`].
pub fn build_test_app() -> TestApp {
    build_test_app_with(FakeWorker::default())
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
