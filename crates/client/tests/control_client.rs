//! Tests for `ControlClient` against a stub control server.
//!
//! The stub answers with the control server's own response and error types,
//! so a change on either side of the wire shows up here.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hirewatch_api::error::AppError;
use hirewatch_api::response::{MessageResponse, StartResponse, StatusResponse};
use hirewatch_client::control::{StartReply, COMMAND_TIMEOUT, STATUS_TIMEOUT};
use hirewatch_client::{ControlClient, ControlError};
use hirewatch_core::error::CoreError;
use hirewatch_core::monitor::MonitorConfig;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct StartBody {
    links: Vec<String>,
    positions: Vec<String>,
}

async fn spawn_stub(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr) -> ControlClient {
    ControlClient::new(format!("http://{addr}/"))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn monitor_config(url: &str, positions: Vec<String>) -> MonitorConfig {
    MonitorConfig {
        target_url: url.to_string(),
        target_positions: positions,
        refresh_interval_ms: 10_000,
        profile_selectors: vec![".job-card".into()],
    }
}

// ---------------------------------------------------------------------------
// Test: the server's start body decodes as the client's reply
// ---------------------------------------------------------------------------

#[test]
fn start_response_decodes_as_start_reply() {
    let response = StartResponse {
        message: "Monitoring started".into(),
        config: monitor_config("https://hiring.amazon/x", strings(&["Engineer"])),
    };

    let wire = serde_json::to_string(&response).unwrap();
    let reply: StartReply = serde_json::from_str(&wire).unwrap();

    assert_eq!(reply.message, response.message);
    assert_eq!(reply.config, response.config);
}

// ---------------------------------------------------------------------------
// Test: successful calls are decoded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_reads_running_flag() {
    let addr = spawn_stub(Router::new().route(
        "/status",
        get(|| async { Json(StatusResponse { is_running: true }) }),
    ))
    .await;

    assert!(client(addr).status().await.unwrap());
}

#[tokio::test]
async fn start_sends_form_and_decodes_config() {
    let addr = spawn_stub(Router::new().route(
        "/start",
        post(|Json(body): Json<StartBody>| async move {
            Json(StartResponse {
                message: "Monitoring started".into(),
                config: monitor_config(&body.links[0], body.positions),
            })
        }),
    ))
    .await;

    let reply = client(addr)
        .start(
            &strings(&["https://hiring.amazon/x"]),
            &strings(&["Engineer"]),
        )
        .await
        .unwrap();

    assert_eq!(reply.message, "Monitoring started");
    assert_eq!(reply.config.target_url, "https://hiring.amazon/x");
    assert_eq!(reply.config.target_positions, vec!["Engineer"]);
}

#[tokio::test]
async fn stop_returns_server_message() {
    let addr = spawn_stub(Router::new().route(
        "/stop",
        post(|| async {
            Json(MessageResponse {
                message: "Monitoring stopped".into(),
            })
        }),
    ))
    .await;

    assert_eq!(client(addr).stop().await.unwrap(), "Monitoring stopped");
}

// ---------------------------------------------------------------------------
// Test: error answers and failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn error_answer_is_rejected_with_server_message() {
    let addr = spawn_stub(Router::new().route(
        "/stop",
        post(|| async { AppError::Core(CoreError::NotRunning).into_response() }),
    ))
    .await;

    let err = client(addr).stop().await.unwrap_err();
    assert_matches!(
        &err,
        ControlError::Rejected { status: 400, message } if message == "Monitoring is not running"
    );
    assert_eq!(err.to_string(), "Monitoring is not running");
}

#[tokio::test]
async fn plain_text_error_body_is_kept() {
    let addr = spawn_stub(Router::new().route(
        "/status",
        get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
    ))
    .await;

    assert_matches!(
        client(addr).status().await,
        Err(ControlError::Rejected { status: 502, message }) if message == "upstream down"
    );
}

#[tokio::test]
async fn unexpected_success_body_is_a_decode_error() {
    let addr = spawn_stub(Router::new().route(
        "/status",
        get(|| async { Json(json!({ "running": true })) }),
    ))
    .await;

    let err = client(addr).status().await.unwrap_err();
    assert_matches!(err, ControlError::Decode { operation: "status", .. });
    assert!(err.to_string().starts_with("Malformed status response"));
}

async fn slow(delay: Duration) -> Response {
    tokio::time::sleep(delay).await;
    Json(MessageResponse {
        message: "too late".into(),
    })
    .into_response()
}

#[tokio::test]
async fn slow_status_times_out_after_five_seconds() {
    let addr = spawn_stub(Router::new().route(
        "/status",
        get(|| slow(Duration::from_secs(8))),
    ))
    .await;

    let started = Instant::now();
    let err = client(addr).status().await.unwrap_err();

    assert_eq!(STATUS_TIMEOUT, Duration::from_secs(5));
    assert_matches!(
        err,
        ControlError::Timeout {
            operation: "status",
            after,
        } if after == STATUS_TIMEOUT
    );
    let elapsed = started.elapsed();
    assert!(elapsed >= STATUS_TIMEOUT && elapsed < Duration::from_secs(8), "{elapsed:?}");
}

#[tokio::test]
async fn slow_stop_times_out_after_ten_seconds() {
    let addr = spawn_stub(Router::new().route(
        "/stop",
        post(|| slow(Duration::from_secs(13))),
    ))
    .await;

    let started = Instant::now();
    let err = client(addr).stop().await.unwrap_err();

    assert_eq!(COMMAND_TIMEOUT, Duration::from_secs(10));
    assert_matches!(
        err,
        ControlError::Timeout {
            operation: "stop",
            after,
        } if after == COMMAND_TIMEOUT
    );
    let elapsed = started.elapsed();
    assert!(elapsed >= COMMAND_TIMEOUT && elapsed < Duration::from_secs(13), "{elapsed:?}");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert_matches!(
        client(addr).status().await,
        Err(ControlError::Transport(_))
    );
}
