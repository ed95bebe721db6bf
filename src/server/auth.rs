//! Bearer-token session extraction.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::error::ApiError;
use super::AppState;
use crate::identity::Account;

/// The logged-in caller of an authenticated route.
///
/// Privilege is re-read from the directory on every request.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    /// Account the session belongs to.
    pub account: Account,
    /// Bearer token presented with the request.
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthenticated)?;
        let account_id = state
            .sessions
            .resolve(token)
            .await
            .ok_or(ApiError::Unauthenticated)?;
        let account = state
            .directory
            .find_by_id(&account_id)
            .await
            .ok_or(ApiError::Unauthenticated)?;

        Ok(Self {
            account,
            token: token.to_owned(),
        })
    }
}
