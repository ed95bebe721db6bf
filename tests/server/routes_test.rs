//! Per-route status codes and response shapes.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use crate::support::{TestApp, ADMIN, ADMIN_SECRET};

#[tokio::test]
async fn health_needs_no_session() {
    let app = TestApp::start().await;
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn marker_routes_require_a_session() {
    let app = TestApp::start().await;

    let (list, _) = app.send(Method::GET, "/markers", None, None).await;
    let (create, _) = app
        .send(Method::POST, "/markers", None, Some(json!({ "lat": 1.0, "lng": 2.0 })))
        .await;
    let (remove, _) = app.send(Method::DELETE, "/markers/abc", None, None).await;
    let (bogus, body) = app
        .send(Method::GET, "/markers", Some("not-a-real-token"), None)
        .await;

    assert_eq!(list, StatusCode::UNAUTHORIZED);
    assert_eq!(create, StatusCode::UNAUTHORIZED);
    assert_eq!(remove, StatusCode::UNAUTHORIZED);
    assert_eq!(bogus, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn report_accepts_anonymous_detections() {
    let app = TestApp::start().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/report",
            None,
            Some(json!({ "lat": 12.97, "lng": 77.59, "confidence": 91.25, "timestamp": "ignored" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let marker = &body["marker"];
    assert_eq!(marker["reported_by"], "automated-detection");
    assert_eq!(marker["confidence"], 91.25);
    assert!(marker["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(marker["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn report_rejects_missing_coordinates() {
    let app = TestApp::start().await;

    let (status, body) = app
        .send(Method::POST, "/report", None, Some(json!({ "lng": 77.59 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(app.state.gateway.list().await.is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::start().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/report")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{lat: 12.9"))
        .expect("request");
    let (status, body) = app.dispatch(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn viewer_can_read_but_not_mutate() {
    let app = TestApp::start().await;
    let token = app.register_and_login("alice", "pw-alice").await;

    let (status, listed) = app.send(Method::GET, "/markers", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));

    let (create, body) = app
        .send(
            Method::POST,
            "/markers",
            Some(&token),
            Some(json!({ "lat": 1.0, "lng": 2.0 })),
        )
        .await;
    assert_eq!(create, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Permission denied");

    let (partial, body) = app
        .send(Method::POST, "/markers", Some(&token), Some(json!({ "lng": 1.0 })))
        .await;
    assert_eq!(partial, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Permission denied");

    let garbage = Request::builder()
        .method(Method::POST)
        .uri("/markers")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{lat:"))
        .expect("request");
    let (unparsable, _) = app.dispatch(garbage).await;
    assert_eq!(unparsable, StatusCode::FORBIDDEN);

    let (remove, _) = app
        .send(Method::DELETE, "/markers/anything", Some(&token), None)
        .await;
    assert_eq!(remove, StatusCode::FORBIDDEN);
    assert!(app.state.gateway.list().await.is_empty());
}

#[tokio::test]
async fn deleting_an_absent_marker_succeeds_with_false() {
    let app = TestApp::start().await;
    let token = app.login(ADMIN, ADMIN_SECRET).await;

    let (status, body) = app
        .send(Method::DELETE, "/markers/does-not-exist", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success", "deleted": false }));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = TestApp::start().await;
    let credentials = json!({ "username": "bob", "password": "pw" });

    let (first, body) = app
        .send(Method::POST, "/register", None, Some(credentials.clone()))
        .await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(body["account"]["role"], "viewer");
    assert!(body["account"].get("password").is_none());

    let (second, _) = app
        .send(Method::POST, "/register", None, Some(credentials))
        .await;
    assert_eq!(second, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_rejects_reserved_identity() {
    let app = TestApp::start().await;
    let (status, _) = app
        .send(
            Method::POST,
            "/register",
            None,
            Some(json!({ "username": "automated-detection", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_login_is_unauthorized() {
    let app = TestApp::start().await;

    let (wrong, wrong_body) = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": ADMIN, "password": "nope" })),
        )
        .await;
    let (unknown, unknown_body) = app
        .send(
            Method::POST,
            "/login",
            None,
            Some(json!({ "username": "ghost", "password": "nope" })),
        )
        .await;

    assert_eq!(wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let app = TestApp::start().await;
    let token = app.login(ADMIN, ADMIN_SECRET).await;

    let (status, _) = app.send(Method::POST, "/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (after, _) = app.send(Method::GET, "/markers", Some(&token), None).await;
    assert_eq!(after, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let app = TestApp::start().await;
    let token = app.login(ADMIN, ADMIN_SECRET).await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/markers")
        .header(header::AUTHORIZATION, format!("bearer {token}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = app.dispatch(request).await;
    assert_eq!(status, StatusCode::OK);
}
