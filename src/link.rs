// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth linking handshake store.
//!
//! Correlates the Google consent redirect with the identity token that
//! started the flow. Entries are single-use (read-and-delete) and
//! expire after five minutes. This is a transient key-value store, not
//! part of the primary database.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;

use crate::error::AppError;

/// Handshake time-to-live.
const STATE_TTL_SECS: i64 = 5 * 60;

/// Bytes of entropy behind each `state` value.
const STATE_BYTES: usize = 32;

struct PendingLink {
    identity_token: String,
    expires_at: DateTime<Utc>,
}

/// Expiring single-use `state -> identity token` store.
#[derive(Clone)]
pub struct LinkStore {
    pending: Arc<DashMap<String, PendingLink>>,
    rng: Arc<SystemRandom>,
}

impl Default for LinkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkStore {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            rng: Arc::new(SystemRandom::new()),
        }
    }

    /// Store the caller's identity token under a fresh unguessable
    /// `state` value and return that value.
    pub fn begin(&self, identity_token: &str) -> Result<String, AppError> {
        let mut bytes = [0u8; STATE_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        let state = URL_SAFE_NO_PAD.encode(bytes);

        self.pending.insert(
            state.clone(),
            PendingLink {
                identity_token: identity_token.to_string(),
                expires_at: Utc::now() + Duration::seconds(STATE_TTL_SECS),
            },
        );

        Ok(state)
    }

    /// Atomically take the identity token for `state`.
    ///
    /// The entry is removed on first read; a second call with the same
    /// state, or a call after expiry, returns None.
    pub fn take(&self, state: &str) -> Option<String> {
        self.take_at(state, Utc::now())
    }

    fn take_at(&self, state: &str, now: DateTime<Utc>) -> Option<String> {
        let (_, entry) = self.pending.remove(state)?;
        if now > entry.expires_at {
            return None;
        }
        Some(entry.identity_token)
    }

    /// Drop expired entries. Called opportunistically by the routes so
    /// abandoned handshakes do not accumulate.
    pub fn sweep(&self) {
        let now = Utc::now();
        self.pending.retain(|_, entry| entry.expires_at >= now);
    }
}
