// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Slotbook: shared booking calendar with Google Calendar sync
//!
//! This crate provides the backend API for a shared booking calendar
//! that keeps each user's bookings reconciled with their Google
//! Calendar in both directions.

pub mod config;
pub mod db;
pub mod error;
pub mod link;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Db;
use link::LinkStore;
use services::{CalendarService, SyncService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub link_store: LinkStore,
    pub calendar: CalendarService,
    pub sync: SyncService,
}
