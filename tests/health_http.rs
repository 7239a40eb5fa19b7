mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use drowsiness_backend::detector::FixedDetector;

use common::app::{spawn_test_app, spawn_with_detector};
use common::http::{request, response_json};

#[tokio::test]
async fn it_health_live_and_ready() {
    let app = spawn_test_app();

    let live = request(&app.app, Method::GET, "/health/live", None, &[]).await;
    assert_eq!(live.status(), StatusCode::OK);

    let ready = request(&app.app, Method::GET, "/health/ready", None, &[]).await;
    assert_eq!(ready.status(), StatusCode::OK);
}

#[tokio::test]
async fn it_health_reports_detector_and_thresholds() {
    let app = spawn_test_app();

    let resp = request(&app.app, Method::GET, "/health", None, &[]).await;
    let (status, headers, body) = response_json(resp).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get("x-request-id").is_some());
    assert_eq!(body["status"], "ok");
    assert_eq!(body["detector"], "disabled");
    assert_eq!(body["earThreshold"], 0.25);
    assert_eq!(body["consecFrames"], 3);
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["sseConnections"], 0);
}

#[tokio::test]
async fn it_health_counts_sessions() {
    let app = spawn_with_detector(Arc::new(FixedDetector::no_face()));
    app.state.sessions().evaluate("cab-1", Some(0.3)).await;
    app.state.sessions().evaluate("cab-2", None).await;

    let resp = request(&app.app, Method::GET, "/health", None, &[]).await;
    let (_, _, body) = response_json(resp).await;
    assert_eq!(body["sessions"], 2);
    assert_eq!(body["detector"], "fixed");
}
