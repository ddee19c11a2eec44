// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile + Google credential fields)
//! - Events (booking CRUD, sync-state lookups)
//! - Atomic check-then-insert for bookings and upsert-by-key for pulls

use crate::error::AppError;
use crate::models::event::{conflicts_with, RemoteFields};
use crate::models::{Event, User};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct Inner {
    users: DashMap<u64, User>,
    events: DashMap<u64, Event>,
    next_user_id: AtomicU64,
    next_event_id: AtomicU64,
    /// Serializes check-then-insert and upsert-by-key so two concurrent
    /// bookings for the same slot (or two overlapping pulls) cannot
    /// both pass their existence check.
    write_lock: Mutex<()>,
}

/// Store handle, cheap to clone.
#[derive(Clone)]
pub struct Db {
    inner: Arc<Inner>,
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}

impl Db {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                users: DashMap::new(),
                events: DashMap::new(),
                next_user_id: AtomicU64::new(1),
                next_event_id: AtomicU64::new(1),
                write_lock: Mutex::new(()),
            }),
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub fn get_user(&self, user_id: u64) -> Result<Option<User>, AppError> {
        Ok(self.inner.users.get(&user_id).map(|u| u.clone()))
    }

    /// Create a user with a fresh id.
    pub fn create_user(&self, name: &str, email: &str) -> Result<User, AppError> {
        let id = self.inner.next_user_id.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            google_account_id: None,
            google_access_token: None,
            google_refresh_token: None,
            google_token_expires_at: None,
            google_calendar_linked: false,
            created_at: crate::time_utils::format_utc_rfc3339(chrono::Utc::now()),
        };
        self.inner.users.insert(id, user.clone());
        Ok(user)
    }

    /// Create or update a user record.
    pub fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.inner.users.insert(user.id, user.clone());
        Ok(())
    }

    /// Users with a linked Google Calendar, for the all-users sync pass.
    pub fn list_linked_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self
            .inner
            .users
            .iter()
            .filter(|u| u.is_linked())
            .map(|u| u.clone())
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    // ─── Event Operations ────────────────────────────────────────

    pub fn get_event(&self, event_id: u64) -> Result<Option<Event>, AppError> {
        Ok(self.inner.events.get(&event_id).map(|e| e.clone()))
    }

    /// All events, ordered by start (the shared booking calendar).
    pub fn list_events(&self) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self.inner.events.iter().map(|e| e.clone()).collect();
        events.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    /// Events owned by a user that have not been pushed yet.
    pub fn list_unsynced_for_owner(&self, owner_id: u64) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self
            .inner
            .events
            .iter()
            .filter(|e| e.owner_id == Some(owner_id) && e.provider_event_id.is_none())
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    /// Events owned by a user that carry a provider id.
    pub fn list_synced_for_owner(&self, owner_id: u64) -> Result<Vec<Event>, AppError> {
        let mut events: Vec<Event> = self
            .inner
            .events
            .iter()
            .filter(|e| e.owner_id == Some(owner_id) && e.provider_event_id.is_some())
            .map(|e| e.clone())
            .collect();
        events.sort_by_key(|e| e.id);
        Ok(events)
    }

    /// Atomic check-then-insert for a new booking.
    ///
    /// Scans all existing events for an overlap before inserting, under
    /// the write lock, so no partial state is written on conflict.
    pub fn create_event_checked(&self, mut event: Event) -> Result<Event, AppError> {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .map_err(|_| AppError::Database("write lock poisoned".to_string()))?;

        for existing in self.inner.events.iter() {
            if conflicts_with(&existing, event.start, event.end) {
                return Err(AppError::SlotConflict(format!(
                    "Requested slot overlaps existing booking '{}'",
                    existing.title
                )));
            }
        }

        event.id = self.inner.next_event_id.fetch_add(1, Ordering::SeqCst);
        self.inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    /// Insert without the overlap check (pull pass: remote is authoritative).
    pub fn insert_event(&self, mut event: Event) -> Result<Event, AppError> {
        event.id = self.inner.next_event_id.fetch_add(1, Ordering::SeqCst);
        self.inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    /// Replace an event record by id.
    pub fn update_event(&self, event: &Event) -> Result<(), AppError> {
        if !self.inner.events.contains_key(&event.id) {
            return Err(AppError::NotFound(format!("Event {}", event.id)));
        }
        self.inner.events.insert(event.id, event.clone());
        Ok(())
    }

    /// Record the provider id assigned to a pushed event.
    pub fn set_provider_event_id(
        &self,
        event_id: u64,
        provider_event_id: &str,
    ) -> Result<(), AppError> {
        let mut entry = self
            .inner
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AppError::NotFound(format!("Event {}", event_id)))?;
        entry.provider_event_id = Some(provider_event_id.to_string());
        entry.updated_at = crate::time_utils::format_utc_rfc3339(chrono::Utc::now());
        Ok(())
    }

    /// Update-or-create matched by `(provider_event_id, owner_id)`.
    ///
    /// Returns the stored event and whether a new row was created.
    pub fn upsert_by_provider_id(
        &self,
        owner_id: u64,
        provider_event_id: &str,
        fields: RemoteFields,
    ) -> Result<(Event, bool), AppError> {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .map_err(|_| AppError::Database("write lock poisoned".to_string()))?;

        let now = crate::time_utils::format_utc_rfc3339(chrono::Utc::now());

        let matched = self
            .inner
            .events
            .iter()
            .find(|e| {
                e.owner_id == Some(owner_id)
                    && e.provider_event_id.as_deref() == Some(provider_event_id)
            })
            .map(|e| e.id);

        if let Some(id) = matched {
            let mut entry = self
                .inner
                .events
                .get_mut(&id)
                .ok_or_else(|| AppError::Database("event vanished during upsert".to_string()))?;
            entry.apply_remote(fields, now);
            return Ok((entry.clone(), false));
        }

        let id = self.inner.next_event_id.fetch_add(1, Ordering::SeqCst);
        let mut event = Event {
            id,
            provider_event_id: Some(provider_event_id.to_string()),
            title: String::new(),
            description: None,
            location: None,
            group_id: uuid::Uuid::new_v4().to_string(),
            url: None,
            start: fields.start,
            end: fields.end,
            all_day: fields.all_day,
            recurrence: None,
            attendees: vec![],
            reminders: None,
            visibility: None,
            status: None,
            color_id: None,
            organizer: None,
            creator: None,
            owner_id: Some(owner_id),
            guest_name: None,
            guest_email: None,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        event.apply_remote(fields, now);
        self.inner.events.insert(id, event.clone());
        Ok((event, true))
    }

    pub fn delete_event(&self, event_id: u64) -> Result<bool, AppError> {
        Ok(self.inner.events.remove(&event_id).is_some())
    }

    /// Delete the event matched by `(provider_event_id, owner_id)`, if any.
    pub fn delete_by_provider_id(
        &self,
        owner_id: u64,
        provider_event_id: &str,
    ) -> Result<bool, AppError> {
        let matched = self
            .inner
            .events
            .iter()
            .find(|e| {
                e.owner_id == Some(owner_id)
                    && e.provider_event_id.as_deref() == Some(provider_event_id)
            })
            .map(|e| e.id);

        match matched {
            Some(id) => Ok(self.inner.events.remove(&id).is_some()),
            None => Ok(false),
        }
    }
}
