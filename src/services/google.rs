// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar API client.
//!
//! Handles:
//! - Event listing (fully paginated), insert, patch, delete
//! - OAuth code exchange and token refresh
//! - Userinfo lookup for the linked account id

use crate::error::AppError;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Calendar all provider operations target; one remote calendar per user.
pub const PRIMARY_CALENDAR: &str = "primary";

/// Bound on every provider call so a hung request cannot stall a sync run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const DEFAULT_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

const OAUTH_SCOPES: &str = "https://www.googleapis.com/auth/calendar \
     https://www.googleapis.com/auth/userinfo.email \
     https://www.googleapis.com/auth/userinfo.profile openid";

// ─── Wire Types ──────────────────────────────────────────────────────────────

/// Start/end of a provider event: either a calendar date (all-day) or
/// an RFC3339 instant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleAttendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleActor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleReminders {
    pub use_default: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<GoogleReminderOverride>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleReminderOverride {
    pub method: String,
    pub minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    pub solution_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceCreateRequest {
    pub request_id: String,
    pub conference_solution_key: ConferenceSolutionKey,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_request: Option<ConferenceCreateRequest>,
}

/// A provider-shaped event payload. Optional fields that are `None`
/// are omitted from outgoing JSON, which is what gives PATCH requests
/// merge semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<GoogleAttendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<GoogleActor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<GoogleActor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<GoogleReminders>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
}

impl GoogleEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

/// One page of an events listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventsPage {
    pub items: Vec<GoogleEvent>,
    pub next_page_token: Option<String>,
}

/// Token endpoint success response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Omitted by Google on repeat consent
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Token endpoint error response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct TokenErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// OpenID Connect userinfo.
#[derive(Debug, Clone, Deserialize)]
pub struct Userinfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Google API client.
#[derive(Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
    auth_url: String,
    userinfo_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleClient {
    /// Create a new Google client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Point every endpoint at `base` (used by tests that stand up a
    /// local fake of the Google API).
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.api_base = format!("{}/calendar/v3", base);
        self.token_url = format!("{}/token", base);
        self.auth_url = format!("{}/auth", base);
        self.userinfo_url = format!("{}/userinfo", base);
        self
    }

    /// Build the consent URL for the OAuth linking handshake.
    pub fn consent_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(OAUTH_SCOPES),
            urlencoding::encode(state),
        )
    }

    // ─── Calendar API ────────────────────────────────────────────────────────

    /// Fetch one page of the primary calendar's events.
    ///
    /// Cancelled events are requested too (`showDeleted`) so the pull
    /// pass can map them to local deletions.
    pub async fn list_events(
        &self,
        access_token: &str,
        page_token: Option<&str>,
    ) -> Result<EventsPage, AppError> {
        let url = format!("{}/calendars/{}/events", self.api_base, PRIMARY_CALENDAR);

        let mut query: Vec<(&str, String)> = vec![
            ("showDeleted", "true".to_string()),
            ("maxResults", "250".to_string()),
            ("singleEvents", "false".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Get a single event by provider id.
    pub async fn get_event(
        &self,
        access_token: &str,
        event_id: &str,
    ) -> Result<GoogleEvent, AppError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base, PRIMARY_CALENDAR, event_id
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Create an event on the primary calendar.
    pub async fn insert_event(
        &self,
        access_token: &str,
        event: &GoogleEvent,
        notify_attendees: bool,
    ) -> Result<GoogleEvent, AppError> {
        let url = format!("{}/calendars/{}/events", self.api_base, PRIMARY_CALENDAR);

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", send_updates(notify_attendees))])
            .json(event);

        // Conference creation requires opting in to conference data v1
        if event.conference_data.is_some() {
            request = request.query(&[("conferenceDataVersion", "1")]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Merge-patch an event: only the fields present in `event` change.
    pub async fn patch_event(
        &self,
        access_token: &str,
        event_id: &str,
        event: &GoogleEvent,
        notify_attendees: bool,
    ) -> Result<GoogleEvent, AppError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base, PRIMARY_CALENDAR, event_id
        );

        let response = self
            .http
            .patch(&url)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", send_updates(notify_attendees))])
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response_json(response).await
    }

    /// Delete an event from the primary calendar.
    pub async fn delete_event(&self, access_token: &str, event_id: &str) -> Result<(), AppError> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            self.api_base, PRIMARY_CALENDAR, event_id
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", send_updates(false))])
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        // Already-gone remote events are fine: the goal state is reached.
        if response.status() == reqwest::StatusCode::NOT_FOUND
            || response.status() == reqwest::StatusCode::GONE
        {
            return Ok(());
        }

        self.check_response(response).await
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Exchange an authorization code for access and refresh tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let description = token_error_description(response).await;
            tracing::error!(error = %description, "Google token exchange failed");
            return Err(AppError::TokenExchangeFailed(description));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::TokenExchangeFailed(format!("JSON parse error: {}", e)))
    }

    /// Refresh an expired access token.
    ///
    /// A provider error response means the refresh token is no longer
    /// usable; the caller must prompt re-linking.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let description = token_error_description(response).await;
            return Err(AppError::AuthExpired(description));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }

    /// Fetch the linked account's OpenID userinfo.
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<Userinfo, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Provider(e.to_string()))?;

        self.check_response_json(response).await
    }

    // ─── Response Helpers ────────────────────────────────────────────────────

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Provider(format!("HTTP {}: {}", status, body)))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("JSON parse error: {}", e)))
    }
}

fn send_updates(notify_attendees: bool) -> &'static str {
    if notify_attendees {
        "all"
    } else {
        "none"
    }
}

async fn token_error_description(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<TokenErrorBody>(&body) {
        Ok(parsed) => parsed
            .error_description
            .or(parsed.error)
            .unwrap_or_else(|| format!("HTTP {}", status)),
        Err(_) => format!("HTTP {}: {}", status, body),
    }
}
