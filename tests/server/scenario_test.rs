//! End-to-end flows across login, ingestion, listing, and restart.

use axum::http::{Method, StatusCode};
use serde_json::json;

use crate::support::{TestApp, ADMIN, ADMIN_SECRET};

#[tokio::test]
async fn operator_marker_without_confidence_reads_back_unknown() {
    let app = TestApp::start().await;
    let token = app.login(ADMIN, ADMIN_SECRET).await;

    let (status, created) = app
        .send(
            Method::POST,
            "/markers",
            Some(&token),
            Some(json!({ "lat": 12.9716, "lng": 77.5946 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "success");
    assert_eq!(created["marker"]["confidence"], "unknown");
    assert_eq!(created["marker"]["reported_by"], ADMIN);

    let (_, listed) = app.send(Method::GET, "/markers", Some(&token), None).await;
    assert_eq!(listed, json!([created["marker"].clone()]));
}

#[tokio::test]
async fn detections_are_visible_to_viewers_and_removable_by_operators() {
    let app = TestApp::start().await;

    let (_, reported) = app
        .send(
            Method::POST,
            "/report",
            None,
            Some(json!({ "lat": 12.9712, "lng": 77.5950, "confidence": 83.1 })),
        )
        .await;
    let id = reported["marker"]["id"].as_str().expect("id").to_owned();

    let viewer = app.register_and_login("carol", "pw-carol").await;
    let (_, seen) = app.send(Method::GET, "/markers", Some(&viewer), None).await;
    assert_eq!(seen.as_array().expect("array").len(), 1);
    assert_eq!(seen[0]["id"], id.as_str());

    let operator = app.login(ADMIN, ADMIN_SECRET).await;
    let (status, body) = app
        .send(Method::DELETE, &format!("/markers/{id}"), Some(&operator), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (_, after) = app.send(Method::GET, "/markers", Some(&viewer), None).await;
    assert_eq!(after, json!([]));
}

#[tokio::test]
async fn state_survives_a_restart_without_reseeding() {
    let first = TestApp::start().await;
    first.register_and_login("dana", "pw-dana").await;
    let (_, created) = first
        .send(
            Method::POST,
            "/report",
            None,
            Some(json!({ "lat": 1.5, "lng": -2.5 })),
        )
        .await;

    let TestApp { dir, .. } = first;
    let restarted = TestApp::start_in(dir).await;

    // Two accounts on disk: the seeded operator and dana. No second seed.
    assert_eq!(restarted.state.directory.len().await, 2);

    let token = restarted.login("dana", "pw-dana").await;
    let (_, listed) = restarted
        .send(Method::GET, "/markers", Some(&token), None)
        .await;
    assert_eq!(listed, json!([created["marker"].clone()]));
}

#[tokio::test]
async fn sessions_do_not_survive_a_restart() {
    let first = TestApp::start().await;
    let token = first.login(ADMIN, ADMIN_SECRET).await;

    let TestApp { dir, .. } = first;
    let restarted = TestApp::start_in(dir).await;

    let (status, _) = restarted
        .send(Method::GET, "/markers", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
