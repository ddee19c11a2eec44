// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Provider client, mapping, token lifecycle, and reconciliation.

pub mod calendar;
pub mod google;
pub mod mapper;
pub mod sync;

pub use calendar::CalendarService;
pub use google::GoogleClient;
pub use sync::{SyncReport, SyncService};
