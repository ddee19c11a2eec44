// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mapping between local events and the provider wire shape.
//!
//! All-day events travel as civil dates (`date`), timed events as
//! RFC3339 instants (`dateTime`). Calendar dates for all-day events are
//! taken in UTC on both directions, so a pushed all-day event pulls
//! back with the same date and the flag intact.

use crate::error::AppError;
use crate::models::event::{
    Attendee, Event, EventStatus, Person, ReminderOverride, Reminders, RemoteFields, Visibility,
};
use crate::services::google::{
    ConferenceCreateRequest, ConferenceData, ConferenceSolutionKey, EventDateTime, GoogleActor,
    GoogleAttendee, GoogleEvent, GoogleReminderOverride, GoogleReminders,
};
use chrono::{DateTime, Duration, Utc};

/// Build the full provider payload for pushing a local event.
///
/// An event with a `url` asks the provider to create a conference, so
/// the link shows up as a proper meeting entry point on the remote
/// side.
pub fn to_remote(event: &Event) -> GoogleEvent {
    let (start, end) = encode_times(event);

    let conference_data = event.url.as_ref().map(|_| ConferenceData {
        create_request: Some(ConferenceCreateRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            conference_solution_key: ConferenceSolutionKey {
                solution_type: "hangoutsMeet".to_string(),
            },
        }),
    });

    GoogleEvent {
        summary: Some(event.title.clone()),
        description: event.description.clone(),
        location: event.location.clone(),
        start: Some(start),
        end: Some(end),
        attendees: attendees_to_remote(&event.attendees),
        reminders: event.reminders.as_ref().map(reminders_to_remote),
        recurrence: event.recurrence.clone(),
        visibility: event.visibility.map(visibility_str).map(str::to_string),
        status: event.status.map(status_str).map(str::to_string),
        color_id: event.color_id.clone(),
        conference_data,
        ..Default::default()
    }
}

/// Build the PATCH payload for an already-pushed event.
///
/// The caller merges the edit into the local record first; this sends
/// the merged state of every provider-authoritative field. The remote
/// PATCH has merge semantics, so a field cleared locally must still be
/// present in the payload as an explicit empty value or the provider
/// would keep its old one. Conference creation is insert-only and
/// never repeated on update.
pub fn to_remote_patch(event: &Event) -> GoogleEvent {
    let mut payload = to_remote(event);
    payload.conference_data = None;

    payload.description = Some(event.description.clone().unwrap_or_default());
    payload.location = Some(event.location.clone().unwrap_or_default());
    payload.attendees = Some(attendee_payloads(&event.attendees));
    payload.recurrence = Some(event.recurrence.clone().unwrap_or_default());
    if payload.reminders.is_none() {
        // Back to the provider default when no overrides remain
        payload.reminders = Some(GoogleReminders {
            use_default: true,
            overrides: vec![],
        });
    }

    payload
}

/// Interpret a pulled provider event as the provider-authoritative
/// field set, keyed by its provider id.
///
/// A `date`-only start marks the event all-day; its instant is midnight
/// UTC of that date.
pub fn from_remote(remote: &GoogleEvent) -> Result<(String, RemoteFields), AppError> {
    let provider_event_id = remote
        .id
        .clone()
        .ok_or_else(|| AppError::Provider("event without id in listing".to_string()))?;

    let start_wire = remote
        .start
        .as_ref()
        .ok_or_else(|| AppError::Provider(format!("event {} has no start", provider_event_id)))?;

    let (start, all_day) = decode_instant(start_wire)
        .ok_or_else(|| AppError::Provider(format!("event {} has empty start", provider_event_id)))?;

    let end = remote
        .end
        .as_ref()
        .and_then(decode_instant)
        .map(|(instant, _)| instant);

    let fields = RemoteFields {
        title: remote.summary.clone().unwrap_or_default(),
        description: remote.description.clone(),
        location: remote.location.clone(),
        start,
        end,
        all_day,
        status: remote.status.as_deref().and_then(parse_status),
        visibility: remote.visibility.as_deref().and_then(parse_visibility),
        color_id: remote.color_id.clone(),
        attendees: attendees_from_remote(remote.attendees.as_deref().unwrap_or(&[])),
        recurrence: remote.recurrence.clone(),
        organizer: remote.organizer.as_ref().map(person_from_remote),
        creator: remote.creator.as_ref().map(person_from_remote),
        reminders: remote.reminders.as_ref().map(reminders_from_remote),
    };

    Ok((provider_event_id, fields))
}

/// Start/end wire encoding, with the end default applied: one hour
/// after start for timed events, the start's own date for all-day ones.
fn encode_times(event: &Event) -> (EventDateTime, EventDateTime) {
    if event.all_day {
        let start_date = event.start.date_naive();
        let end_date = event.end.map(|e| e.date_naive()).unwrap_or(start_date);
        (
            EventDateTime {
                date: Some(start_date),
                ..Default::default()
            },
            EventDateTime {
                date: Some(end_date),
                ..Default::default()
            },
        )
    } else {
        let end = event.end.unwrap_or(event.start + Duration::hours(1));
        (
            EventDateTime {
                date_time: Some(event.start.fixed_offset()),
                ..Default::default()
            },
            EventDateTime {
                date_time: Some(end.fixed_offset()),
                ..Default::default()
            },
        )
    }
}

fn decode_instant(wire: &EventDateTime) -> Option<(DateTime<Utc>, bool)> {
    if let Some(instant) = wire.date_time {
        return Some((instant.with_timezone(&Utc), false));
    }
    let date = wire.date?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some((midnight.and_utc(), true))
}

fn attendees_to_remote(attendees: &[Attendee]) -> Option<Vec<GoogleAttendee>> {
    if attendees.is_empty() {
        return None;
    }
    Some(attendee_payloads(attendees))
}

fn attendee_payloads(attendees: &[Attendee]) -> Vec<GoogleAttendee> {
    attendees
        .iter()
        .map(|a| GoogleAttendee {
            email: a.email.clone(),
            display_name: None,
            response_status: a.response_status.clone(),
        })
        .collect()
}

fn attendees_from_remote(attendees: &[GoogleAttendee]) -> Vec<Attendee> {
    attendees
        .iter()
        .map(|a| Attendee {
            email: a.email.clone(),
            response_status: a.response_status.clone(),
        })
        .collect()
}

fn person_from_remote(actor: &GoogleActor) -> Person {
    Person {
        email: actor.email.clone(),
        display_name: actor.display_name.clone(),
    }
}

fn reminders_to_remote(reminders: &Reminders) -> GoogleReminders {
    GoogleReminders {
        use_default: reminders.use_default,
        overrides: reminders
            .overrides
            .iter()
            .map(|o| GoogleReminderOverride {
                method: o.method.clone(),
                minutes: o.minutes,
            })
            .collect(),
    }
}

fn reminders_from_remote(reminders: &GoogleReminders) -> Reminders {
    Reminders {
        use_default: reminders.use_default,
        overrides: reminders
            .overrides
            .iter()
            .map(|o| ReminderOverride {
                method: o.method.clone(),
                minutes: o.minutes,
            })
            .collect(),
    }
}

fn visibility_str(v: Visibility) -> &'static str {
    match v {
        Visibility::Default => "default",
        Visibility::Public => "public",
        Visibility::Private => "private",
        Visibility::Confidential => "confidential",
    }
}

fn parse_visibility(s: &str) -> Option<Visibility> {
    match s {
        "default" => Some(Visibility::Default),
        "public" => Some(Visibility::Public),
        "private" => Some(Visibility::Private),
        "confidential" => Some(Visibility::Confidential),
        _ => None,
    }
}

fn status_str(s: EventStatus) -> &'static str {
    match s {
        EventStatus::Confirmed => "confirmed",
        EventStatus::Tentative => "tentative",
        EventStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> Option<EventStatus> {
    match s {
        "confirmed" => Some(EventStatus::Confirmed),
        "tentative" => Some(EventStatus::Tentative),
        "cancelled" => Some(EventStatus::Cancelled),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timed_event() -> Event {
        Event {
            id: 1,
            provider_event_id: None,
            title: "Design review".to_string(),
            description: Some("Quarterly".to_string()),
            location: None,
            group_id: "g1".to_string(),
            url: None,
            start: Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap(),
            end: Some(Utc.with_ymd_and_hms(2025, 7, 1, 11, 30, 0).unwrap()),
            all_day: false,
            recurrence: None,
            attendees: vec![Attendee {
                email: "ada@example.com".to_string(),
                response_status: None,
            }],
            reminders: None,
            visibility: Some(Visibility::Private),
            status: Some(EventStatus::Confirmed),
            color_id: None,
            organizer: None,
            creator: None,
            owner_id: Some(1),
            guest_name: None,
            guest_email: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_timed_event_uses_date_time() {
        let remote = to_remote(&timed_event());
        let start = remote.start.unwrap();
        assert!(start.date.is_none());
        assert_eq!(
            start.date_time.unwrap().with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(remote.visibility.as_deref(), Some("private"));
        assert_eq!(remote.status.as_deref(), Some("confirmed"));
    }

    #[test]
    fn test_missing_end_defaults_to_one_hour() {
        let mut event = timed_event();
        event.end = None;
        let remote = to_remote(&event);
        assert_eq!(
            remote.end.unwrap().date_time.unwrap().with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 7, 1, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_all_day_event_uses_civil_dates() {
        let mut event = timed_event();
        event.all_day = true;
        event.end = None;
        let remote = to_remote(&event);

        let start = remote.start.unwrap();
        assert!(start.date_time.is_none());
        assert_eq!(start.date.unwrap().to_string(), "2025-07-01");
        // All-day end defaults to the start's own date
        assert_eq!(remote.end.unwrap().date.unwrap().to_string(), "2025-07-01");
    }

    #[test]
    fn test_all_day_survives_round_trip() {
        let mut event = timed_event();
        event.all_day = true;

        let mut pushed = to_remote(&event);
        pushed.id = Some("gid-1".to_string());

        let (id, fields) = from_remote(&pushed).unwrap();
        assert_eq!(id, "gid-1");
        assert!(fields.all_day);
        assert_eq!(fields.start.date_naive().to_string(), "2025-07-01");
    }

    #[test]
    fn test_patch_sends_cleared_fields_explicitly() {
        let mut event = timed_event();
        event.attendees.clear();
        event.description = None;
        event.location = None;
        event.recurrence = None;
        event.reminders = None;

        let patch = to_remote_patch(&event);
        // Merge-patch: an omitted field keeps its remote value, so a
        // cleared one must still appear as an explicit empty value
        assert!(patch.attendees.as_ref().is_some_and(|a| a.is_empty()));
        assert_eq!(patch.description.as_deref(), Some(""));
        assert_eq!(patch.location.as_deref(), Some(""));
        assert_eq!(patch.recurrence, Some(vec![]));
        assert!(patch.reminders.as_ref().unwrap().use_default);

        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["attendees"], serde_json::json!([]));
        assert_eq!(json["description"], serde_json::json!(""));
    }

    #[test]
    fn test_url_requests_conference_on_insert_only() {
        let mut event = timed_event();
        event.url = Some("https://meet.example.com/abc".to_string());

        let insert = to_remote(&event);
        assert!(insert.conference_data.is_some());

        let patch = to_remote_patch(&event);
        assert!(patch.conference_data.is_none());
    }

    #[test]
    fn test_from_remote_maps_fields() {
        let remote: GoogleEvent = serde_json::from_value(serde_json::json!({
            "id": "gid-2",
            "status": "tentative",
            "summary": "Pulled",
            "start": {"dateTime": "2025-07-02T09:00:00+02:00"},
            "end": {"dateTime": "2025-07-02T10:00:00+02:00"},
            "attendees": [{"email": "bob@example.com", "responseStatus": "accepted"}]
        }))
        .unwrap();

        let (id, fields) = from_remote(&remote).unwrap();
        assert_eq!(id, "gid-2");
        assert!(!fields.all_day);
        assert_eq!(
            fields.start,
            Utc.with_ymd_and_hms(2025, 7, 2, 7, 0, 0).unwrap()
        );
        assert_eq!(fields.status, Some(EventStatus::Tentative));
        assert_eq!(fields.attendees.len(), 1);
        assert_eq!(
            fields.attendees[0].response_status.as_deref(),
            Some("accepted")
        );
    }

    #[test]
    fn test_from_remote_requires_id_and_start() {
        let no_id = GoogleEvent {
            start: Some(EventDateTime::default()),
            ..Default::default()
        };
        assert!(from_remote(&no_id).is_err());

        let no_start = GoogleEvent {
            id: Some("gid".to_string()),
            ..Default::default()
        };
        assert!(from_remote(&no_start).is_err());
    }
}
