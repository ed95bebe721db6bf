//! Route handlers. Each one is a thin adapter over the gateway or directory.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::CurrentSession;
use super::error::ApiError;
use super::AppState;
use crate::gateway::MarkerSubmission;
use crate::markers::Marker;

/// Registration and login body.
#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    /// Requested or existing identity.
    pub username: String,
    /// Plaintext secret; hashed before storage.
    pub password: String,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let creds = body(payload)?;
    let account = state
        .directory
        .register(&creds.username, &creds.password)
        .await?;
    Ok(Json(json!({ "status": "success", "account": account })))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let creds = body(payload)?;
    let account = state
        .directory
        .authenticate(&creds.username, &creds.password)
        .await?;
    let token = state.sessions.open(&account).await;
    info!(identity = %account.identity, "login succeeded");
    Ok(Json(
        json!({ "status": "success", "token": token, "account": account }),
    ))
}

/// `POST /logout`
pub async fn logout(State(state): State<AppState>, session: CurrentSession) -> Json<Value> {
    state.sessions.close(&session.token).await;
    Json(json!({ "status": "success" }))
}

/// `GET /markers`
pub async fn list_markers(
    State(state): State<AppState>,
    _session: CurrentSession,
) -> Json<Vec<Marker>> {
    Json(state.gateway.list().await)
}

/// `POST /markers`
pub async fn create_marker(
    State(state): State<AppState>,
    session: CurrentSession,
    payload: Result<Json<MarkerSubmission>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    state.gateway.authorize_create(&session.account)?;
    let submission = body(payload)?;
    let marker = state
        .gateway
        .submit_authenticated(&session.account, submission)
        .await?;
    Ok(Json(json!({ "status": "success", "marker": marker })))
}

/// `DELETE /markers/:id`
pub async fn delete_marker(
    State(state): State<AppState>,
    session: CurrentSession,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state.gateway.delete(&session.account, &id).await?;
    Ok(Json(json!({ "status": "success", "deleted": deleted })))
}

/// `POST /report`, the open automated-detection ingress.
pub async fn report(
    State(state): State<AppState>,
    payload: Result<Json<MarkerSubmission>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let submission = body(payload)?;
    let marker = state.gateway.submit_automated(submission).await?;
    Ok(Json(json!({ "status": "success", "marker": marker })))
}
