// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile with the sync-relevant Google account fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    /// Google account id, set when the calendar is linked
    pub google_account_id: Option<String>,
    /// Current Google access token (plaintext; storage encryption is
    /// the storage collaborator's concern)
    pub google_access_token: Option<String>,
    /// Refresh token; presence signals "calendar linked"
    pub google_refresh_token: Option<String>,
    /// When the access token expires
    pub google_token_expires_at: Option<DateTime<Utc>>,
    pub google_calendar_linked: bool,
    pub created_at: String,
}

impl User {
    /// Whether this user has a linked Google Calendar.
    pub fn is_linked(&self) -> bool {
        self.google_calendar_linked && self.google_refresh_token.is_some()
    }
}
