// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar operations on behalf of a linked user.
//!
//! Every call resolves a valid access token first: the stored token is
//! used while unexpired, otherwise it is refreshed and the new
//! credentials are persisted before the provider call goes out. Tokens
//! are never cached outside the user record.

use crate::db::Db;
use crate::error::AppError;
use crate::models::User;
use crate::services::google::{EventsPage, GoogleClient, GoogleEvent, Userinfo};
use chrono::{Duration, Utc};

/// Tokens within this many seconds of expiry are treated as expired,
/// so a provider call does not race the deadline.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Default lifetime when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Clone)]
pub struct CalendarService {
    client: GoogleClient,
    db: Db,
}

impl CalendarService {
    pub fn new(client: GoogleClient, db: Db) -> Self {
        Self { client, db }
    }

    pub fn client(&self) -> &GoogleClient {
        &self.client
    }

    /// Resolve a usable access token for `user_id`.
    ///
    /// Refreshes through the provider when the stored token is expired;
    /// a refresh rejection surfaces as [`AppError::AuthExpired`] so the
    /// caller can prompt re-linking.
    pub async fn valid_access_token(&self, user_id: u64) -> Result<String, AppError> {
        let user = self.require_user(user_id)?;

        if !user.google_calendar_linked {
            return Err(AppError::AuthExpired(
                "Google Calendar is not connected".to_string(),
            ));
        }

        let now = Utc::now();
        let usable = user.google_token_expires_at.is_some_and(|expires_at| {
            expires_at - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > now
        });

        if usable {
            if let Some(token) = user.google_access_token.clone() {
                return Ok(token);
            }
        }

        let refresh_token = user.google_refresh_token.clone().ok_or_else(|| {
            AppError::AuthExpired("No refresh token stored for this account".to_string())
        })?;

        tracing::debug!(user_id, "refreshing expired Google access token");
        let refreshed = self.client.refresh_token(&refresh_token).await?;

        let mut updated = user;
        updated.google_access_token = Some(refreshed.access_token.clone());
        updated.google_token_expires_at = Some(
            now + Duration::seconds(refreshed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
        );
        if let Some(new_refresh) = refreshed.refresh_token {
            updated.google_refresh_token = Some(new_refresh);
        }
        self.db.upsert_user(&updated)?;

        Ok(refreshed.access_token)
    }

    // ─── Provider Operations ─────────────────────────────────────────────────

    /// Every event on the user's primary calendar, across all pages.
    pub async fn list_all_events(&self, user_id: u64) -> Result<Vec<GoogleEvent>, AppError> {
        let token = self.valid_access_token(user_id).await?;

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let EventsPage {
                items,
                next_page_token,
            } = self.client.list_events(&token, page_token.as_deref()).await?;

            events.extend(items);
            match next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(events)
    }

    pub async fn insert_event(
        &self,
        user_id: u64,
        event: &GoogleEvent,
        notify_attendees: bool,
    ) -> Result<GoogleEvent, AppError> {
        let token = self.valid_access_token(user_id).await?;
        self.client
            .insert_event(&token, event, notify_attendees)
            .await
    }

    pub async fn patch_event(
        &self,
        user_id: u64,
        event_id: &str,
        event: &GoogleEvent,
        notify_attendees: bool,
    ) -> Result<GoogleEvent, AppError> {
        let token = self.valid_access_token(user_id).await?;
        self.client
            .patch_event(&token, event_id, event, notify_attendees)
            .await
    }

    pub async fn delete_event(&self, user_id: u64, event_id: &str) -> Result<(), AppError> {
        let token = self.valid_access_token(user_id).await?;
        self.client.delete_event(&token, event_id).await
    }

    // ─── Account Linking ─────────────────────────────────────────────────────

    /// Complete the OAuth handshake: exchange the authorization code,
    /// look up the Google account, and persist the credentials.
    ///
    /// Google only returns a refresh token on first consent; an
    /// existing stored refresh token survives a re-link that omits one.
    pub async fn complete_link(&self, user_id: u64, code: &str) -> Result<User, AppError> {
        let user = self.require_user(user_id)?;

        let tokens = self.client.exchange_code(code).await?;
        let userinfo: Userinfo = self.client.fetch_userinfo(&tokens.access_token).await?;

        let mut updated = user;
        updated.google_account_id = Some(userinfo.sub);
        updated.google_access_token = Some(tokens.access_token);
        updated.google_token_expires_at = Some(
            Utc::now()
                + Duration::seconds(tokens.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)),
        );
        if let Some(refresh) = tokens.refresh_token {
            updated.google_refresh_token = Some(refresh);
        }
        updated.google_calendar_linked = true;
        self.db.upsert_user(&updated)?;

        tracing::info!(user_id, "Google Calendar linked");
        Ok(updated)
    }

    /// Drop all stored Google credentials for the user.
    pub fn unlink(&self, user_id: u64) -> Result<User, AppError> {
        let mut user = self.require_user(user_id)?;

        user.google_account_id = None;
        user.google_access_token = None;
        user.google_refresh_token = None;
        user.google_token_expires_at = None;
        user.google_calendar_linked = false;
        self.db.upsert_user(&user)?;

        tracing::info!(user_id, "Google Calendar unlinked");
        Ok(user)
    }

    fn require_user(&self, user_id: u64) -> Result<User, AppError> {
        self.db
            .get_user(user_id)?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))
    }
}
