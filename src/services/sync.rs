// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bidirectional reconciliation against Google Calendar.
//!
//! A run makes three ordered passes over one user's events:
//!
//! 1. Push: local events without a provider id are inserted remotely
//!    and the assigned id is recorded.
//! 2. Pull: every remote event is upserted locally by provider id;
//!    cancelled remote events delete their local counterpart.
//! 3. Delete: synced local events whose provider id was not seen
//!    during the pull are removed (they vanished remotely).
//!
//! Per-event failures are collected in the report and do not stop the
//! run. Credential failures abort the whole run, since every later
//! call would fail the same way. At most one run per user executes at
//! a time; a second request is rejected, not queued.

use crate::db::Db;
use crate::error::AppError;
use crate::services::calendar::CalendarService;
use crate::services::mapper;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Users reconciled concurrently by [`SyncService::reconcile_all`].
const MAX_CONCURRENT_RUNS: usize = 4;

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub pushed: usize,
    pub pulled: usize,
    pub deleted_local: usize,
    pub errors: Vec<SyncIssue>,
}

/// A per-event failure that did not stop the run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_event_id: Option<String>,
    pub message: String,
}

#[derive(Clone)]
pub struct SyncService {
    calendar: CalendarService,
    db: Db,
    run_locks: Arc<DashMap<u64, ()>>,
}

/// Releases a user's run lock when the run ends, on any path.
struct RunGuard {
    locks: Arc<DashMap<u64, ()>>,
    user_id: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.locks.remove(&self.user_id);
    }
}

impl SyncService {
    pub fn new(calendar: CalendarService, db: Db) -> Self {
        Self {
            calendar,
            db,
            run_locks: Arc::new(DashMap::new()),
        }
    }

    fn acquire_run_lock(&self, user_id: u64) -> Result<RunGuard, AppError> {
        match self.run_locks.entry(user_id) {
            dashmap::Entry::Occupied(_) => Err(AppError::SyncInProgress),
            dashmap::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(RunGuard {
                    locks: self.run_locks.clone(),
                    user_id,
                })
            }
        }
    }

    /// Full three-pass reconciliation for one user.
    pub async fn reconcile(&self, user_id: u64) -> Result<SyncReport, AppError> {
        let _guard = self.acquire_run_lock(user_id)?;
        let mut report = SyncReport::default();

        self.push_pass(user_id, &mut report).await?;

        // The delete pass needs the complete remote set; if the listing
        // failed partway there is no safe seen-set to reconcile against.
        let remote = match self.calendar.list_all_events(user_id).await {
            Ok(remote) => remote,
            Err(err @ AppError::AuthExpired(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(user_id, error = %err, "remote listing failed, skipping pull");
                report.errors.push(SyncIssue {
                    event_id: None,
                    provider_event_id: None,
                    message: format!("listing failed: {}", err),
                });
                return Ok(report);
            }
        };

        let mut seen: HashSet<String> = HashSet::with_capacity(remote.len());
        for remote_event in &remote {
            let Some(provider_event_id) = remote_event.id.clone() else {
                continue;
            };

            if remote_event.is_cancelled() {
                if self.db.delete_by_provider_id(user_id, &provider_event_id)? {
                    report.deleted_local += 1;
                }
                continue;
            }

            match mapper::from_remote(remote_event) {
                Ok((provider_event_id, fields)) => {
                    self.db
                        .upsert_by_provider_id(user_id, &provider_event_id, fields)?;
                    seen.insert(provider_event_id);
                    report.pulled += 1;
                }
                Err(err) => {
                    tracing::warn!(user_id, provider_event_id, error = %err, "skipping unmappable remote event");
                    report.errors.push(SyncIssue {
                        event_id: None,
                        provider_event_id: Some(provider_event_id),
                        message: err.to_string(),
                    });
                }
            }
        }

        for event in self.db.list_synced_for_owner(user_id)? {
            let known = event
                .provider_event_id
                .as_ref()
                .is_some_and(|id| seen.contains(id));
            if !known && self.db.delete_event(event.id)? {
                tracing::debug!(user_id, event_id = event.id, "removing event deleted remotely");
                report.deleted_local += 1;
            }
        }

        tracing::info!(
            user_id,
            pushed = report.pushed,
            pulled = report.pulled,
            deleted_local = report.deleted_local,
            errors = report.errors.len(),
            "reconciliation complete"
        );
        Ok(report)
    }

    /// Push-only run: upload unsynced local events, no pull or delete.
    pub async fn push_only(&self, user_id: u64) -> Result<SyncReport, AppError> {
        let _guard = self.acquire_run_lock(user_id)?;
        let mut report = SyncReport::default();
        self.push_pass(user_id, &mut report).await?;
        Ok(report)
    }

    async fn push_pass(&self, user_id: u64, report: &mut SyncReport) -> Result<(), AppError> {
        for event in self.db.list_unsynced_for_owner(user_id)? {
            let payload = mapper::to_remote(&event);
            match self.calendar.insert_event(user_id, &payload, true).await {
                Ok(created) => {
                    let Some(provider_event_id) = created.id else {
                        report.errors.push(SyncIssue {
                            event_id: Some(event.id),
                            provider_event_id: None,
                            message: "provider returned no event id".to_string(),
                        });
                        continue;
                    };
                    self.db.set_provider_event_id(event.id, &provider_event_id)?;
                    report.pushed += 1;
                }
                Err(err @ AppError::AuthExpired(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(user_id, event_id = event.id, error = %err, "push failed");
                    report.errors.push(SyncIssue {
                        event_id: Some(event.id),
                        provider_event_id: None,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Reconcile every linked user. One user's failure never touches
    /// another's run.
    pub async fn reconcile_all(&self) -> Vec<(u64, Result<SyncReport, AppError>)> {
        let users = match self.db.list_linked_users() {
            Ok(users) => users,
            Err(err) => {
                tracing::error!(error = %err, "could not list linked users");
                return Vec::new();
            }
        };

        stream::iter(users)
            .map(|user| async move {
                let outcome = self.reconcile(user.id).await;
                if let Err(err) = &outcome {
                    tracing::warn!(user_id = user.id, error = %err, "reconciliation failed");
                }
                (user.id, outcome)
            })
            .buffer_unordered(MAX_CONCURRENT_RUNS)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::google::GoogleClient;

    fn service() -> SyncService {
        let db = Db::new();
        let client = GoogleClient::new(
            "id".to_string(),
            "secret".to_string(),
            "http://localhost/cb".to_string(),
        );
        SyncService::new(CalendarService::new(client, db.clone()), db)
    }

    #[test]
    fn test_run_lock_is_exclusive_per_user() {
        let sync = service();

        let guard = sync.acquire_run_lock(7).unwrap();
        assert!(matches!(
            sync.acquire_run_lock(7),
            Err(AppError::SyncInProgress)
        ));

        // A different user is unaffected
        let other = sync.acquire_run_lock(8).unwrap();
        drop(other);

        // Released when the run ends
        drop(guard);
        assert!(sync.acquire_run_lock(7).is_ok());
    }
}
