// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local event model and the booking overlap predicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event visibility, matching the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Default,
    Public,
    Private,
    Confidential,
}

/// Event status, matching the provider's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// An event attendee.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

/// Organizer/creator record as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A single reminder override (minutes before the event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: i64,
}

/// Reminders: either "use provider default" or explicit overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ReminderOverride>,
}

/// An event record owned by local storage.
///
/// `provider_event_id == None` means the event has not been pushed to
/// Google Calendar yet. Exactly one of `owner_id` or the
/// `guest_name`/`guest_email` pair attributes the booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    /// Google Calendar event id; None until pushed
    pub provider_event_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Correlation id shared by related events (auto-generated UUID)
    pub group_id: String,
    /// Optional meeting URL; requests provider conference data on push
    pub url: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    /// Provider-native recurrence rule strings, opaque to this system
    pub recurrence: Option<Vec<String>>,
    pub attendees: Vec<Attendee>,
    pub reminders: Option<Reminders>,
    pub visibility: Option<Visibility>,
    pub status: Option<EventStatus>,
    pub color_id: Option<String>,
    pub organizer: Option<Person>,
    pub creator: Option<Person>,
    pub owner_id: Option<u64>,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields the provider is authoritative for during a pull pass.
///
/// Applied over a matched local event (or a fresh one) without touching
/// local identity, grouping, or attribution.
#[derive(Debug, Clone)]
pub struct RemoteFields {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: bool,
    pub status: Option<EventStatus>,
    pub visibility: Option<Visibility>,
    pub color_id: Option<String>,
    pub attendees: Vec<Attendee>,
    pub recurrence: Option<Vec<String>>,
    pub organizer: Option<Person>,
    pub creator: Option<Person>,
    pub reminders: Option<Reminders>,
}

impl Event {
    /// Overwrite the provider-authoritative fields from a pull.
    pub fn apply_remote(&mut self, fields: RemoteFields, now: String) {
        self.title = fields.title;
        self.description = fields.description;
        self.location = fields.location;
        self.start = fields.start;
        self.end = fields.end;
        self.all_day = fields.all_day;
        self.status = fields.status;
        self.visibility = fields.visibility;
        self.color_id = fields.color_id;
        self.attendees = fields.attendees;
        self.recurrence = fields.recurrence;
        self.organizer = fields.organizer;
        self.creator = fields.creator;
        self.reminders = fields.reminders;
        self.updated_at = now;
    }

    /// Check the owner-XOR-guest attribution invariant.
    pub fn has_valid_attribution(&self) -> bool {
        match self.owner_id {
            Some(_) => self.guest_name.is_none() && self.guest_email.is_none(),
            None => self.guest_name.is_some() && self.guest_email.is_some(),
        }
    }
}

/// Half-open interval overlap check against one existing event.
///
/// A candidate without an end has no defined extent, so it only
/// collides with an existing event pinned at the exact same start
/// instant.
pub fn conflicts_with(
    existing: &Event,
    candidate_start: DateTime<Utc>,
    candidate_end: Option<DateTime<Utc>>,
) -> bool {
    match candidate_end {
        Some(cand_end) => match existing.end {
            Some(exist_end) => existing.start < cand_end && exist_end > candidate_start,
            None => existing.start >= candidate_start && existing.start < cand_end,
        },
        None => existing.start == candidate_start,
    }
}
