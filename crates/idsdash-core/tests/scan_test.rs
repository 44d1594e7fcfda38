#![allow(clippy::unwrap_used)]
// Scan polling against a mocked backend.

use std::time::Duration;

use idsdash_api::models::{ScanRequest, ScanState};
use idsdash_core::{CoreError, Dashboard, DashboardConfig, ScanPollConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(timeout: Duration) -> (MockServer, Dashboard) {
    let server = MockServer::start().await;
    let config = DashboardConfig {
        api_base: server.uri(),
        scan: ScanPollConfig {
            interval: Duration::from_millis(10),
            timeout,
        },
        ..DashboardConfig::default()
    };
    (server, Dashboard::new(config).unwrap())
}

fn status_body(status: &str, progress: u8) -> serde_json::Value {
    json!({"ok": true, "scan": {"status": status, "progress": progress, "done": 1, "targets": 4}})
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_polls_until_done() {
    let (server, dashboard) = setup(Duration::from_secs(5)).await;

    Mock::given(method("GET"))
        .and(path("/api/scan/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("running", 40)))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/scan/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("done", 100)))
        .mount(&server)
        .await;

    let mut seen = Vec::new();
    let status = dashboard
        .wait_for_scan(|s| seen.push(s.progress))
        .await
        .unwrap();

    assert_eq!(status.state, ScanState::Done);
    assert_eq!(status.progress, 100);
    assert_eq!(seen, [40, 40, 100]);
}

#[tokio::test]
async fn test_error_state_is_terminal_not_a_failure() {
    let (server, dashboard) = setup(Duration::from_secs(5)).await;
    Mock::given(method("GET"))
        .and(path("/api/scan/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "scan": {"status": "error", "progress": 10, "message": "nmap missing"}
        })))
        .mount(&server)
        .await;

    let status = dashboard.wait_for_scan(|_| {}).await.unwrap();
    assert_eq!(status.state, ScanState::Error);
    assert_eq!(status.message.as_deref(), Some("nmap missing"));
}

#[tokio::test]
async fn test_never_terminal_times_out() {
    let (server, dashboard) = setup(Duration::from_millis(100)).await;
    Mock::given(method("GET"))
        .and(path("/api/scan/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("running", 55)))
        .mount(&server)
        .await;

    let err = dashboard.wait_for_scan(|_| {}).await.unwrap_err();
    assert!(
        matches!(err, CoreError::ScanTimeout { last_progress: 55, .. }),
        "expected ScanTimeout, got {err:?}"
    );
}

#[tokio::test]
async fn test_start_then_wait() {
    let (server, dashboard) = setup(Duration::from_secs(5)).await;
    Mock::given(method("POST"))
        .and(path("/api/scan"))
        .and(body_json(json!({"cidr": "192.168.1.0/30"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true, "targets": 2, "ports": [22, 80]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/scan/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("done", 100)))
        .mount(&server)
        .await;

    let request = ScanRequest {
        cidr: Some("192.168.1.0/30".into()),
        ..ScanRequest::default()
    };
    let (started, status) = dashboard.scan(&request, |_| {}).await.unwrap();
    assert_eq!(started.targets, Some(2));
    assert_eq!(started.ports, [22, 80]);
    assert!(status.state.is_terminal());
}

#[tokio::test]
async fn test_auth_failure_aborts_wait() {
    let (server, dashboard) = setup(Duration::from_secs(5)).await;
    Mock::given(method("GET"))
        .and(path("/api/scan/status"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"ok": false})))
        .mount(&server)
        .await;

    let err = dashboard.wait_for_scan(|_| {}).await.unwrap_err();
    assert!(err.api().is_some_and(idsdash_api::Error::is_auth_expired));
}

#[tokio::test]
async fn test_slow_status_request_is_bounded_by_deadline() {
    let (server, dashboard) = setup(Duration::from_millis(200)).await;
    Mock::given(method("GET"))
        .and(path("/api/scan/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("running", 10))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let err = dashboard.wait_for_scan(|_| {}).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2), "took {:?}", started.elapsed());
    assert!(matches!(
        err,
        CoreError::ScanTimeout { timeout, last_progress: 0 } if timeout == Duration::from_millis(200)
    ));
}
