// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod event;
pub mod user;

pub use event::{
    Attendee, Event, EventStatus, Person, ReminderOverride, Reminders, RemoteFields, Visibility,
};
pub use user::User;
