// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

pub mod fake_google;

use chrono::{Duration, Utc};
use slotbook::config::Config;
use slotbook::db::Db;
use slotbook::link::LinkStore;
use slotbook::models::User;
use slotbook::routes::create_router;
use slotbook::services::{CalendarService, GoogleClient, SyncService};
use slotbook::AppState;
use std::sync::Arc;

/// Create a test app whose Google endpoints point at `base` (usually a
/// [`fake_google`] server). Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app_with_google(base: &str) -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = Db::new();
    let link_store = LinkStore::new();

    let client = GoogleClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
    )
    .with_base_url(base);

    let calendar = CalendarService::new(client, db.clone());
    let sync = SyncService::new(calendar.clone(), db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        link_store,
        calendar,
        sync,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with no reachable Google backend, for tests that
/// never leave the local API.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    // Port 9 (discard) refuses connections immediately
    create_test_app_with_google("http://127.0.0.1:9")
}

/// Seed a user without a linked calendar.
#[allow(dead_code)]
pub fn seed_user(state: &AppState) -> User {
    state
        .db
        .create_user("Test User", "user@example.com")
        .expect("seed user")
}

/// Seed a user with Google credentials on record. `token_expired`
/// controls whether the stored access token is still inside its
/// lifetime.
#[allow(dead_code)]
pub fn seed_linked_user(state: &AppState, token_expired: bool) -> User {
    let mut user = seed_user(state);
    user.google_account_id = Some("google-sub-1".to_string());
    user.google_access_token = Some("stored-access-token".to_string());
    user.google_refresh_token = Some("stored-refresh-token".to_string());
    user.google_token_expires_at = Some(if token_expired {
        Utc::now() - Duration::minutes(5)
    } else {
        Utc::now() + Duration::hours(1)
    });
    user.google_calendar_linked = true;
    state.db.upsert_user(&user).expect("seed linked user");
    user
}

/// Session token for a seeded user.
#[allow(dead_code)]
pub fn session_token(state: &AppState, user_id: u64) -> String {
    slotbook::middleware::auth::create_jwt(user_id, &state.config.jwt_signing_key)
        .expect("test jwt")
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
