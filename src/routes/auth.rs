// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session info and the Google Calendar linking handshake.
//!
//! Linking flow:
//! 1. `GET /auth/google/redirect` (authenticated): store the caller's
//!    session token under a fresh `state` and return the consent URL.
//! 2. The browser completes consent at Google and lands on
//!    `GET /auth/google/callback?state=...&code=...`, which carries no
//!    session credentials of its own. The single-use `state` lookup
//!    recovers who started the flow.
//! 3. The code is exchanged for tokens, credentials are persisted, and
//!    the browser is redirected back to the frontend.

use crate::error::{AppError, Result};
use crate::middleware::auth::{extract_token, verify_token, AuthUser};
use crate::models::User;
use crate::routes::envelope;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get};
use axum::{Extension, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/google/callback", get(google_callback))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/google/redirect", get(google_redirect))
        .route("/auth/google/disconnect", delete(google_disconnect))
}

/// User shape safe to return to clients; credentials never leave the
/// server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub google_calendar_linked: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            google_calendar_linked: user.google_calendar_linked,
        }
    }
}

/// Current user's profile.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    let user = state
        .db
        .get_user(auth.user_id)?
        .ok_or(AppError::InvalidToken)?;

    Ok(envelope(StatusCode::OK, "OK", UserProfile::from(&user)).into_response())
}

#[derive(Serialize)]
struct RedirectResponse {
    url: String,
}

/// Start the linking handshake and hand back the consent URL.
async fn google_redirect(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<Response> {
    // The raw session token goes into the handshake store so the
    // callback, which arrives without credentials, can recover it.
    let token = extract_token(&jar, &headers).ok_or(AppError::Unauthorized)?;

    state.link_store.sweep();
    let oauth_state = state.link_store.begin(&token)?;
    let url = state.calendar.client().consent_url(&oauth_state);

    Ok(envelope(StatusCode::OK, "OK", RedirectResponse { url }).into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    state: Option<String>,
    code: Option<String>,
    error: Option<String>,
}

/// Google consent redirect target.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response> {
    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Google consent denied");
        let url = format!(
            "{}?googleLink=error&reason={}",
            state.config.frontend_url,
            urlencoding::encode(&error)
        );
        return Ok(Redirect::to(&url).into_response());
    }

    let oauth_state = query.state.ok_or(AppError::InvalidOrExpiredState)?;
    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let identity_token = state
        .link_store
        .take(&oauth_state)
        .ok_or(AppError::InvalidOrExpiredState)?;

    let auth_user = verify_token(&identity_token, &state.config.jwt_signing_key)
        .ok_or(AppError::InvalidToken)?;

    state.calendar.complete_link(auth_user.user_id, &code).await?;

    let url = format!("{}?googleLink=success", state.config.frontend_url);
    Ok(Redirect::to(&url).into_response())
}

/// Unlink Google Calendar and drop the stored credentials.
async fn google_disconnect(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    let user = state.calendar.unlink(auth.user_id)?;

    Ok(envelope(
        StatusCode::OK,
        "Google Calendar disconnected",
        UserProfile::from(&user),
    )
    .into_response())
}
