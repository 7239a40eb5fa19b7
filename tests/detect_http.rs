mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use drowsiness_backend::detector::FixedDetector;
use drowsiness_core::LandmarkPoint;
use serde_json::json;

use common::app::{spawn_test_app, spawn_with_detector};
use common::fixtures::{
    closed_face, landmarks_body, no_face_body, open_face, png_data_url, CLOSED_EAR, OPEN_EAR,
};
use common::http::{assert_json_error, post_json, request, response_json};

#[tokio::test]
async fn it_missing_image_is_rejected() {
    let app = spawn_test_app();

    let (status, headers, body) = post_json(&app.app, "/detect", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "NO_IMAGE");
    assert_eq!(body["error"], "No image provided");
    assert!(headers.get("x-request-id").is_some());
    assert!(app.state.sessions().is_empty().await);
}

#[tokio::test]
async fn it_closed_eyes_streak_turns_drowsy() {
    let app = spawn_test_app();
    let closed = landmarks_body(&closed_face());

    for expected in 1..=2u32 {
        let (status, _, body) = post_json(&app.app, "/detect", closed.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ear"], CLOSED_EAR);
        assert_eq!(body["frames_below"], expected);
        assert_eq!(body["drowsy"], false);
        assert!(body.get("message").is_none());
    }

    let (_, _, body) = post_json(&app.app, "/detect", closed.clone()).await;
    assert_eq!(body["frames_below"], 3);
    assert_eq!(body["drowsy"], true);

    let (_, _, body) = post_json(&app.app, "/detect", closed).await;
    assert_eq!(body["frames_below"], 4);
    assert_eq!(body["drowsy"], true);
}

#[tokio::test]
async fn it_open_eyes_reset_the_streak() {
    let app = spawn_test_app();

    for _ in 0..3 {
        post_json(&app.app, "/detect", landmarks_body(&closed_face())).await;
    }
    let (status, _, body) = post_json(&app.app, "/detect", landmarks_body(&open_face())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ear"], OPEN_EAR);
    assert_eq!(body["frames_below"], 0);
    assert_eq!(body["drowsy"], false);
}

#[tokio::test]
async fn it_missing_face_resets_and_reports_no_face() {
    let app = spawn_test_app();

    for _ in 0..3 {
        post_json(&app.app, "/detect", landmarks_body(&closed_face())).await;
    }
    let (status, _, body) = post_json(&app.app, "/detect", no_face_body()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "no_face");
    assert_eq!(body["ear"], 0.0);
    assert_eq!(body["frames_below"], 0);
    assert_eq!(body["drowsy"], false);
}

#[tokio::test]
async fn it_short_landmark_list_is_rejected_without_touching_state() {
    let app = spawn_test_app();
    post_json(&app.app, "/detect", landmarks_body(&closed_face())).await;

    let bad = json!({
        "landmarks": {"width": 256, "height": 256, "faces": [[{"x": 0.1, "y": 0.1}]]}
    });
    let (status, _, body) = post_json(&app.app, "/detect", bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_LANDMARKS");

    let snapshot = app.state.sessions().snapshot("default").await.unwrap();
    assert_eq!(snapshot.frames_below, 1);
    assert_eq!(snapshot.frames_seen, 1);
}

#[tokio::test]
async fn it_zero_sized_landmark_frame_is_rejected() {
    let app = spawn_test_app();
    let bad = json!({"landmarks": {"width": 0, "height": 256, "faces": []}});

    let (status, _, body) = post_json(&app.app, "/detect", bad).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_LANDMARKS");
}

#[tokio::test]
async fn it_image_without_detector_is_unavailable() {
    let app = spawn_test_app();

    let (status, _, body) = post_json(
        &app.app,
        "/detect",
        json!({"image": png_data_url(256, 256)}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_json_error(&body, "DETECTOR_UNAVAILABLE");
}

#[tokio::test]
async fn it_image_runs_through_detector() {
    let app = spawn_with_detector(Arc::new(FixedDetector::single(closed_face())));
    let image = png_data_url(256, 256);

    let (status, _, body) = post_json(&app.app, "/detect", json!({"image": image})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ear"], CLOSED_EAR);
    assert_eq!(body["frames_below"], 1);
}

#[tokio::test]
async fn it_image_takes_precedence_over_landmarks() {
    let app = spawn_with_detector(Arc::new(FixedDetector::single(open_face())));
    let mut body = landmarks_body(&closed_face());
    body["image"] = json!(png_data_url(256, 256));

    let (status, _, body) = post_json(&app.app, "/detect", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ear"], OPEN_EAR);
}

#[tokio::test]
async fn it_image_without_face_reports_no_face() {
    let app = spawn_with_detector(Arc::new(FixedDetector::no_face()));

    let (status, _, body) = post_json(
        &app.app,
        "/api/detect",
        json!({"image": png_data_url(64, 48)}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "no_face");
    assert_eq!(body["drowsy"], false);
}

#[tokio::test]
async fn it_undecodable_image_is_rejected() {
    let app = spawn_with_detector(Arc::new(FixedDetector::single(closed_face())));

    let (status, _, body) = post_json(
        &app.app,
        "/detect",
        json!({"image": "data:image/png;base64,aGVsbG8gd29ybGQ="}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_IMAGE");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Could not decode image"));
    assert!(app.state.sessions().is_empty().await);
}

#[tokio::test]
async fn it_malformed_json_is_rejected() {
    let app = spawn_test_app();

    let resp = request(
        &app.app,
        Method::POST,
        "/detect",
        None,
        &[("content-type", "application/json".to_string())],
    )
    .await;
    let (status, _, body) = response_json(resp).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn it_sessions_are_isolated() {
    let app = spawn_test_app();

    let mut cab_a = landmarks_body(&closed_face());
    cab_a["session_id"] = json!("cab-a");
    let mut cab_b = landmarks_body(&open_face());
    cab_b["sessionId"] = json!("cab-b");

    post_json(&app.app, "/detect", cab_a.clone()).await;
    post_json(&app.app, "/detect", cab_b).await;
    let (_, headers, body) = post_json(&app.app, "/detect", cab_a).await;

    assert_eq!(body["frames_below"], 2);
    assert_eq!(headers.get("x-session-id").unwrap(), "cab-a");

    let b = app.state.sessions().snapshot("cab-b").await.unwrap();
    assert_eq!(b.frames_below, 0);
    assert!(app.state.sessions().snapshot("default").await.is_none());
}

#[tokio::test]
async fn it_session_header_selects_session() {
    let app = spawn_test_app();

    let resp = request(
        &app.app,
        Method::POST,
        "/api/detect",
        Some(landmarks_body(&closed_face())),
        &[("x-session-id", "dash-cam".to_string())],
    )
    .await;
    let (status, headers, _) = response_json(resp).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-session-id").unwrap(), "dash-cam");
    assert!(app.state.sessions().snapshot("dash-cam").await.is_some());
}

#[tokio::test]
async fn it_invalid_session_id_is_rejected() {
    let app = spawn_test_app();
    let mut body = landmarks_body(&closed_face());
    body["session_id"] = json!("not a valid id!");

    let (status, _, body) = post_json(&app.app, "/detect", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_json_error(&body, "INVALID_SESSION_ID");
}

#[tokio::test]
async fn it_oversized_body_is_rejected() {
    let mut config = common::app::test_config();
    config.limits.max_body_bytes = 1024;
    let app = common::app::spawn_with(config, Arc::new(FixedDetector::no_face()));

    let (status, _, body) = post_json(
        &app.app,
        "/detect",
        json!({"image": "A".repeat(4096)}),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn it_out_of_range_client_landmarks_are_rejected() {
    let app = spawn_test_app();
    post_json(&app.app, "/detect", landmarks_body(&closed_face())).await;

    let mut far_corners = closed_face();
    far_corners.0[33] = LandmarkPoint::new(1e308, 0.5);
    far_corners.0[133] = LandmarkPoint::new(1e308, 0.5);
    let mut far_lid = closed_face();
    far_lid.0[160] = LandmarkPoint::new(-1e308, 0.5);

    for face in [far_corners, far_lid] {
        let (status, _, body) = post_json(&app.app, "/detect", landmarks_body(&face)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_json_error(&body, "INVALID_LANDMARKS");
    }

    let snapshot = app.state.sessions().snapshot("default").await.unwrap();
    assert_eq!(snapshot.frames_below, 1);
}

#[tokio::test]
async fn it_out_of_range_detector_landmarks_are_bad_gateway() {
    let mut face = closed_face();
    face.0[362] = LandmarkPoint::new(0.4, 5e300);
    let app = spawn_with_detector(Arc::new(FixedDetector::single(face)));

    let (status, _, body) = post_json(
        &app.app,
        "/detect",
        json!({"image": png_data_url(256, 256)}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_json_error(&body, "DETECTOR_ERROR");
    assert!(app.state.sessions().is_empty().await);
}
