//! HTTP control API against a real listener on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use chat_herald::http::server;
use chat_herald::models::status::StatusReport;
use chat_herald::monitor::Monitor;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::test_helpers::{test_config, test_monitor};

async fn spawn_server() -> (String, Arc<Monitor>, CancellationToken) {
    let mut config = test_config();
    config.source.args = vec!["-c".into(), "exec sleep 30".into(), "chat-source".into()];
    let http = config.http.clone();

    let (monitor, ct) = test_monitor(config);
    let listener = server::bind(&http).await.expect("bind ephemeral");
    let port = listener.local_addr().expect("local addr").port();

    let server_monitor = Arc::clone(&monitor);
    let server_ct = ct.clone();
    tokio::spawn(async move {
        let _ = server::serve(listener, server_monitor, &http, server_ct).await;
    });

    (format!("http://127.0.0.1:{port}"), monitor, ct)
}

#[tokio::test]
async fn health_returns_ok() {
    let (base_url, _monitor, ct) = spawn_server().await;

    let resp = reqwest::get(format!("{base_url}/health"))
        .await
        .expect("HTTP GET /health");

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.expect("body"), "ok");
    ct.cancel();
}

#[tokio::test]
async fn status_reports_idle_pipeline() {
    let (base_url, _monitor, ct) = spawn_server().await;

    let status: StatusReport = reqwest::get(format!("{base_url}/api/status"))
        .await
        .expect("HTTP GET /api/status")
        .json()
        .await
        .expect("status json");

    assert_eq!(status.token_address, None);
    assert_eq!(status.queue_depth, 0);
    assert!(!status.processing);
    ct.cancel();
}

#[tokio::test]
async fn start_then_stop_monitoring() {
    let (base_url, monitor, ct) = spawn_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base_url}/api/start"))
        .json(&serde_json::json!({ "token_address": "So1anaMint", "token_name": "HERALD" }))
        .send()
        .await
        .expect("HTTP POST /api/start");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"]["token_address"], "So1anaMint");
    assert_eq!(body["status"]["token_name"], "HERALD");

    let resp = client
        .post(format!("{base_url}/api/stop"))
        .send()
        .await
        .expect("HTTP POST /api/stop");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"]["token_address"], Value::Null);

    monitor.shutdown().await;
    ct.cancel();
}

#[tokio::test]
async fn start_with_invalid_address_is_bad_request() {
    let (base_url, monitor, ct) = spawn_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{base_url}/api/start"))
        .json(&serde_json::json!({ "token_address": "not a token" }))
        .send()
        .await
        .expect("HTTP POST /api/start");

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("json");
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap_or_default().contains("whitespace"));
    assert_eq!(monitor.status().await.token_address, None);
    ct.cancel();
}

#[tokio::test]
async fn server_stops_on_cancellation() {
    let (base_url, _monitor, ct) = spawn_server().await;
    ct.cancel();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let result = reqwest::Client::new()
        .get(format!("{base_url}/health"))
        .timeout(Duration::from_secs(2))
        .send()
        .await;
    assert!(result.is_err(), "server should refuse connections after shutdown");
}
