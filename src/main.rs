// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Slotbook API Server
//!
//! Shared booking calendar backend that keeps bookings reconciled with
//! each user's Google Calendar in both directions.

use slotbook::{
    config::Config,
    db::Db,
    link::LinkStore,
    services::{CalendarService, GoogleClient, SyncService},
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Slotbook API");

    let db = Db::new();
    let link_store = LinkStore::new();

    let client = GoogleClient::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
    );
    let calendar = CalendarService::new(client, db.clone());
    let sync = SyncService::new(calendar.clone(), db.clone());

    // Periodic reconciliation of every linked user
    if config.sync_interval_secs > 0 {
        let period = Duration::from_secs(config.sync_interval_secs);
        let scheduler_sync = sync.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                ticker.tick().await;
                tracing::info!("starting scheduled reconciliation");
                let outcomes = scheduler_sync.reconcile_all().await;
                let failures = outcomes.iter().filter(|(_, r)| r.is_err()).count();
                tracing::info!(
                    users = outcomes.len(),
                    failures,
                    "scheduled reconciliation finished"
                );
            }
        });
        tracing::info!(
            interval_secs = config.sync_interval_secs,
            "Background sync scheduler started"
        );
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        link_store,
        calendar,
        sync,
    });

    // Build router
    let app = slotbook::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("slotbook=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
