// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar listing and sync triggers for the authenticated user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::routes::envelope;
use crate::services::google::GoogleEvent;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calendar", get(list_calendar))
        .route("/api/calendar/sync", post(sync_calendar))
        .route("/api/calendar/push", post(push_calendar))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListing {
    /// Everything on the linked Google Calendar
    remote: Vec<GoogleEvent>,
    /// Caller's local bookings that have not been pushed yet
    local_only: Vec<crate::models::Event>,
}

/// Combined view: the linked remote calendar plus local bookings that
/// have not reached it yet.
async fn list_calendar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    let user = state
        .db
        .get_user(auth.user_id)?
        .ok_or(AppError::InvalidToken)?;
    if !user.is_linked() {
        return Err(AppError::BadRequest(
            "Google Calendar is not connected".to_string(),
        ));
    }

    let remote = state.calendar.list_all_events(auth.user_id).await?;
    let local_only = state.db.list_unsynced_for_owner(auth.user_id)?;

    Ok(envelope(StatusCode::OK, "OK", CalendarListing { remote, local_only }).into_response())
}

/// Run a full reconciliation for the caller.
async fn sync_calendar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    let report = state.sync.reconcile(auth.user_id).await?;
    Ok(envelope(StatusCode::OK, "Sync complete", report).into_response())
}

/// Upload the caller's unsynced bookings without pulling.
async fn push_calendar(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Response> {
    let report = state.sync.push_only(auth.user_id).await?;
    Ok(envelope(StatusCode::OK, "Push complete", report).into_response())
}
