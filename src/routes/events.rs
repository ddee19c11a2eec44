// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking CRUD.
//!
//! Creation and reads are public: the calendar is a shared booking
//! surface and guests book without an account. A created booking is
//! attributed either to the authenticated caller or to the guest
//! name/email pair, never both. Edits and deletes require the owner.

use crate::error::{AppError, Result};
use crate::middleware::auth::{extract_token, verify_token, AuthUser};
use crate::models::event::{Attendee, Event, EventStatus, Reminders, Visibility};
use crate::routes::envelope;
use crate::services::mapper;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/{id}", get(get_event))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/events/{id}", axum::routing::put(update_event).delete(delete_event))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
    pub group_id: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    pub reminders: Option<Reminders>,
    pub visibility: Option<Visibility>,
    pub color_id: Option<String>,
    pub recurrence: Option<Vec<String>>,
    pub guest_name: Option<String>,
    #[validate(email)]
    pub guest_email: Option<String>,
}

/// Distinguishes a field set to JSON `null` (`Some(None)`, a clear)
/// from one absent from the request (`None`, leave untouched).
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub group_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    pub attendees: Option<Vec<Attendee>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reminders: Option<Option<Reminders>>,
    pub visibility: Option<Visibility>,
    pub status: Option<EventStatus>,
    pub color_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub recurrence: Option<Option<Vec<String>>>,
}

fn validation_error(errors: validator::ValidationErrors) -> AppError {
    match serde_json::to_value(&errors) {
        Ok(value) => AppError::Validation(value),
        Err(err) => AppError::Internal(err.into()),
    }
}

/// All bookings, ordered by start.
async fn list_events(State(state): State<Arc<AppState>>) -> Result<Response> {
    let events = state.db.list_events()?;
    Ok(envelope(StatusCode::OK, "OK", events).into_response())
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Response> {
    let event = state
        .db
        .get_event(id)?
        .ok_or_else(|| AppError::NotFound(format!("Event {}", id)))?;
    Ok(envelope(StatusCode::OK, "OK", event).into_response())
}

/// Book a slot.
///
/// Insertion and the overlap check are one atomic step, so a conflict
/// leaves no partial state. On success the booking is pushed to the
/// owner's Google Calendar right away when one is linked; a push
/// failure is logged and left for the next sync run.
async fn create_event(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<CreateEventRequest>,
) -> Result<Response> {
    req.validate().map_err(validation_error)?;

    if let Some(end) = req.end {
        if end < req.start {
            return Err(AppError::BadRequest(
                "Event end must not be before its start".to_string(),
            ));
        }
    }

    // Optional principal: a valid session makes this an owner booking,
    // otherwise the guest pair is required.
    let principal = extract_token(&jar, &headers)
        .and_then(|token| verify_token(&token, &state.config.jwt_signing_key));

    let (owner_id, guest_name, guest_email) = match &principal {
        Some(auth) => {
            state
                .db
                .get_user(auth.user_id)?
                .ok_or(AppError::InvalidToken)?;
            (Some(auth.user_id), None, None)
        }
        None => match (req.guest_name.clone(), req.guest_email.clone()) {
            (Some(name), Some(email)) => (None, Some(name), Some(email)),
            _ => {
                return Err(AppError::Validation(serde_json::json!({
                    "guestName": "guest bookings require guestName and guestEmail",
                    "guestEmail": "guest bookings require guestName and guestEmail",
                })))
            }
        },
    };

    let now = format_utc_rfc3339(Utc::now());
    let event = Event {
        id: 0,
        provider_event_id: None,
        title: req.title,
        description: req.description,
        location: req.location,
        group_id: req
            .group_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        url: req.url,
        start: req.start,
        end: req.end,
        all_day: req.all_day,
        recurrence: req.recurrence,
        attendees: req.attendees,
        reminders: req.reminders,
        visibility: req.visibility,
        status: Some(EventStatus::Confirmed),
        color_id: req.color_id,
        organizer: None,
        creator: None,
        owner_id,
        guest_name,
        guest_email,
        created_at: now.clone(),
        updated_at: now,
    };

    let mut event = state.db.create_event_checked(event)?;

    if let Some(owner_id) = event.owner_id {
        if let Err(err) = push_now(&state, owner_id, &mut event).await {
            tracing::warn!(event_id = event.id, error = %err, "immediate push failed");
        }
    }

    Ok(envelope(StatusCode::CREATED, "Event created", event).into_response())
}

/// Push a fresh booking to a linked owner's calendar, recording the
/// assigned provider id.
async fn push_now(state: &AppState, owner_id: u64, event: &mut Event) -> Result<()> {
    let linked = state
        .db
        .get_user(owner_id)?
        .is_some_and(|user| user.is_linked());
    if !linked {
        return Ok(());
    }

    let payload = mapper::to_remote(event);
    let created = state.calendar.insert_event(owner_id, &payload, true).await?;
    if let Some(provider_event_id) = created.id {
        state
            .db
            .set_provider_event_id(event.id, &provider_event_id)?;
        event.provider_event_id = Some(provider_event_id);
    }
    Ok(())
}

/// Edit a booking (owner only). Absent request fields keep their
/// current value, an explicit `null` (or empty array) clears the
/// field; a pushed event is patched remotely with the merged state,
/// cleared fields included.
async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Response> {
    req.validate().map_err(validation_error)?;

    let mut event = state
        .db
        .get_event(id)?
        .filter(|e| e.owner_id == Some(auth.user_id))
        .ok_or_else(|| AppError::NotFound(format!("Event {}", id)))?;

    if let Some(title) = req.title {
        event.title = title;
    }
    if let Some(start) = req.start {
        event.start = start;
    }
    if let Some(end) = req.end {
        event.end = Some(end);
    }
    if let Some(all_day) = req.all_day {
        event.all_day = all_day;
    }
    if let Some(group_id) = req.group_id {
        event.group_id = group_id;
    }
    if let Some(url) = req.url {
        event.url = url;
    }
    if let Some(description) = req.description {
        event.description = description;
    }
    if let Some(location) = req.location {
        event.location = location;
    }
    if let Some(attendees) = req.attendees {
        event.attendees = attendees;
    }
    if let Some(reminders) = req.reminders {
        event.reminders = reminders;
    }
    if let Some(visibility) = req.visibility {
        event.visibility = Some(visibility);
    }
    if let Some(status) = req.status {
        event.status = Some(status);
    }
    if let Some(color_id) = req.color_id {
        event.color_id = Some(color_id);
    }
    if let Some(recurrence) = req.recurrence {
        event.recurrence = recurrence;
    }

    if let Some(end) = event.end {
        if end < event.start {
            return Err(AppError::BadRequest(
                "Event end must not be before its start".to_string(),
            ));
        }
    }

    event.updated_at = format_utc_rfc3339(Utc::now());
    state.db.update_event(&event)?;

    if let Some(provider_event_id) = event.provider_event_id.clone() {
        let payload = mapper::to_remote_patch(&event);
        if let Err(err) = state
            .calendar
            .patch_event(auth.user_id, &provider_event_id, &payload, true)
            .await
        {
            tracing::warn!(event_id = event.id, error = %err, "remote patch failed");
        }
    }

    Ok(envelope(StatusCode::OK, "Event updated", event).into_response())
}

/// Delete a booking (owner only). The remote copy is removed quietly,
/// without attendee notifications; a remote failure still deletes the
/// local record.
async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<u64>,
) -> Result<Response> {
    let event = state
        .db
        .get_event(id)?
        .filter(|e| e.owner_id == Some(auth.user_id))
        .ok_or_else(|| AppError::NotFound(format!("Event {}", id)))?;

    if let Some(provider_event_id) = &event.provider_event_id {
        if let Err(err) = state
            .calendar
            .delete_event(auth.user_id, provider_event_id)
            .await
        {
            tracing::warn!(event_id = event.id, error = %err, "remote delete failed");
        }
    }

    state.db.delete_event(id)?;
    Ok(envelope(StatusCode::OK, "Event deleted", serde_json::Value::Null).into_response())
}
