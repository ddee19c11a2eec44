// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth linking handshake tests: state issuance, single-use callback,
//! and credential persistence against a fake Google backend.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

use common::fake_google::FakeGoogle;

#[tokio::test]
async fn test_redirect_requires_auth() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/google/redirect")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_redirect_returns_consent_url_with_state() {
    let (app, state) = common::create_test_app();
    let user = common::seed_user(&state);
    let token = common::session_token(&state, user.id);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/google/redirect")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    let url = body["data"]["url"].as_str().unwrap();
    assert!(url.contains("state="));
    assert!(url.contains("access_type=offline"));
    assert!(url.contains("prompt=consent"));
}

#[tokio::test]
async fn test_callback_with_unknown_state_rejected() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/google/callback?state=never-issued&code=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_consent_denial_redirects_to_frontend() {
    let (app, state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/auth/google/callback?error=access_denied")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers().get(header::LOCATION).unwrap();
    assert!(location
        .to_str()
        .unwrap()
        .starts_with(&state.config.frontend_url));
}

#[tokio::test]
async fn test_full_link_flow_persists_credentials() {
    let google = FakeGoogle::spawn().await;
    let (app, state) = common::create_test_app_with_google(&google.base_url);
    let user = common::seed_user(&state);
    let token = common::session_token(&state, user.id);

    // Begin the handshake to get a real state value
    let oauth_state = state.link_store.begin(&token).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/auth/google/callback?state={}&code=auth-code-1",
                    oauth_state
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers().get(header::LOCATION).unwrap();
    assert!(location.to_str().unwrap().contains("googleLink=success"));

    let linked = state.db.get_user(user.id).unwrap().unwrap();
    assert!(linked.google_calendar_linked);
    assert_eq!(linked.google_account_id.as_deref(), Some("google-sub-1"));
    assert_eq!(
        linked.google_access_token.as_deref(),
        Some("exchanged-access-token")
    );
    assert_eq!(
        linked.google_refresh_token.as_deref(),
        Some("exchanged-refresh-token")
    );

    // The state was consumed by the first callback
    let replay = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/auth/google/callback?state={}&code=auth-code-1",
                    oauth_state
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_state_rejected() {
    let (app, state) = common::create_test_app();
    let user = common::seed_user(&state);
    let token = common::session_token(&state, user.id);

    let oauth_state = state.link_store.begin(&token).unwrap();
    // A sweep after expiry would drop the entry; here the entry is
    // still present but consumed, which must behave the same way
    state.link_store.take(&oauth_state).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/auth/google/callback?state={}&code=auth-code-1",
                    oauth_state
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_disconnect_clears_credentials() {
    let (app, state) = common::create_test_app();
    let user = common::seed_linked_user(&state, false);
    let token = common::session_token(&state, user.id);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/auth/google/disconnect")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let cleared = state.db.get_user(user.id).unwrap().unwrap();
    assert!(!cleared.google_calendar_linked);
    assert!(cleared.google_access_token.is_none());
    assert!(cleared.google_refresh_token.is_none());
    assert!(cleared.google_account_id.is_none());
}
