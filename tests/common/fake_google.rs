// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process stand-in for the Google OAuth and Calendar endpoints.
//!
//! Serves just enough of the real API surface for integration tests:
//! token exchange/refresh, userinfo, and paginated event CRUD on the
//! primary calendar.

#![allow(dead_code)]

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeState {
    /// Remote events, each carrying an "id" field
    pub events: Vec<Value>,
    pub next_id: u64,
    /// Events per listing page; 0 means everything in one page
    pub page_size: usize,
    /// Make the token endpoint reject refresh grants
    pub fail_refresh: bool,
    pub refresh_calls: usize,
    pub exchange_calls: usize,
}

pub struct FakeGoogle {
    pub base_url: String,
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeGoogle {
    pub async fn spawn() -> Self {
        let state = Arc::new(Mutex::new(FakeState::default()));
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake Google server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake Google server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    #[allow(dead_code)]
    pub fn add_remote_event(&self, event: Value) {
        let mut state = self.state.lock().unwrap();
        state.events.push(event);
    }

    #[allow(dead_code)]
    pub fn set_page_size(&self, page_size: usize) {
        self.state.lock().unwrap().page_size = page_size;
    }

    #[allow(dead_code)]
    pub fn set_fail_refresh(&self, fail: bool) {
        self.state.lock().unwrap().fail_refresh = fail;
    }

    #[allow(dead_code)]
    pub fn remote_events(&self) -> Vec<Value> {
        self.state.lock().unwrap().events.clone()
    }

    #[allow(dead_code)]
    pub fn remove_remote_event(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.events.retain(|e| e["id"] != json!(id));
    }

    #[allow(dead_code)]
    pub fn refresh_calls(&self) -> usize {
        self.state.lock().unwrap().refresh_calls
    }
}

fn router(state: Arc<Mutex<FakeState>>) -> Router {
    Router::new()
        .route("/token", axum::routing::post(token))
        .route("/userinfo", get(userinfo))
        .route(
            "/calendar/v3/calendars/primary/events",
            get(list_events).post(insert_event),
        )
        .route(
            "/calendar/v3/calendars/primary/events/{id}",
            get(get_event).patch(patch_event).delete(delete_event),
        )
        .with_state(state)
}

async fn token(
    State(state): State<Arc<Mutex<FakeState>>>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().unwrap();

    match params.get("grant_type").map(String::as_str) {
        Some("refresh_token") => {
            state.refresh_calls += 1;
            if state.fail_refresh {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "error": "invalid_grant",
                        "error_description": "Token has been expired or revoked."
                    })),
                )
                    .into_response();
            }
            Json(json!({
                "access_token": format!("refreshed-token-{}", state.refresh_calls),
                "expires_in": 3600
            }))
            .into_response()
        }
        Some("authorization_code") => {
            state.exchange_calls += 1;
            Json(json!({
                "access_token": "exchanged-access-token",
                "refresh_token": "exchanged-refresh-token",
                "expires_in": 3600
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        )
            .into_response(),
    }
}

async fn userinfo() -> Json<Value> {
    Json(json!({
        "sub": "google-sub-1",
        "email": "linked@example.com",
        "name": "Linked User"
    }))
}

async fn list_events(
    State(state): State<Arc<Mutex<FakeState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.lock().unwrap();

    let offset: usize = params
        .get("pageToken")
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);
    let size = if state.page_size == 0 {
        state.events.len().max(1)
    } else {
        state.page_size
    };

    let items: Vec<Value> = state.events.iter().skip(offset).take(size).cloned().collect();
    let mut body = json!({ "items": items });
    if offset + size < state.events.len() {
        body["nextPageToken"] = json!((offset + size).to_string());
    }
    Json(body)
}

async fn insert_event(
    State(state): State<Arc<Mutex<FakeState>>>,
    Json(mut event): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.next_id += 1;
    event["id"] = json!(format!("g{}", state.next_id));
    if event.get("status").is_none() {
        event["status"] = json!("confirmed");
    }
    state.events.push(event.clone());
    Json(event)
}

async fn get_event(
    State(state): State<Arc<Mutex<FakeState>>>,
    Path(id): Path<String>,
) -> Response {
    let state = state.lock().unwrap();
    match state.events.iter().find(|e| e["id"] == json!(id)) {
        Some(event) => Json(event.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn patch_event(
    State(state): State<Arc<Mutex<FakeState>>>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap();
    let Some(event) = state.events.iter_mut().find(|e| e["id"] == json!(id)) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let (Some(target), Some(fields)) = (event.as_object_mut(), patch.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    Json(event.clone()).into_response()
}

async fn delete_event(
    State(state): State<Arc<Mutex<FakeState>>>,
    Path(id): Path<String>,
) -> StatusCode {
    let mut state = state.lock().unwrap();
    let before = state.events.len();
    state.events.retain(|e| e["id"] != json!(id));
    if state.events.len() < before {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
