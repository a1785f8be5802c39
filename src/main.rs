// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pulse API Server
//!
//! Habit tracking backend: journal, weekly check-ins, streaks, and daily
//! reminders on top of Firebase Auth, Firestore and Cloud Storage.

use pulse_tracker::{
    config::Config,
    db::{FirestoreDb, HabitStore},
    services::{
        CloudTasksTrigger, FirebaseIdentity, GcsBlobStore, LogNotifier, NativeTrigger,
        NotificationScheduler, Notifier, WebhookNotifier,
    },
    time_utils::{Clock, SystemClock},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Pulse API");

    // Initialize Firestore database
    let db: Arc<dyn HabitStore> =
        Arc::new(FirestoreDb::new(&config.gcp_project_id, &config.firebase_app_id).await?);

    let identity = Arc::new(FirebaseIdentity::new(&config.firebase_api_key));
    let blobs = Arc::new(GcsBlobStore::new(&config.storage_bucket));
    tracing::info!(bucket = %config.storage_bucket, "Object storage initialized");

    let notifier: Arc<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => {
            tracing::info!("Reminders delivered via webhook");
            Arc::new(WebhookNotifier::new(url))
        }
        None => {
            tracing::info!("Reminders delivered to the log");
            Arc::new(LogNotifier)
        }
    };

    let native: Option<Arc<dyn NativeTrigger>> = if config.native_reminders {
        tracing::info!(
            project = %config.gcp_project_id,
            queue = %config.reminder_queue_name,
            "Cloud Tasks reminder triggers enabled"
        );
        Some(Arc::new(CloudTasksTrigger::new(
            &config.gcp_project_id,
            &config.gcp_region,
            &config.reminder_queue_name,
            &config.api_url,
            &config.jwt_signing_key,
        )))
    } else {
        None
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = NotificationScheduler::new(
        db.clone(),
        notifier,
        native,
        clock.clone(),
        config.default_reminder_time,
    );

    // Re-arm reminders that were enabled before the restart
    if let Err(e) = scheduler.restore().await {
        tracing::warn!(error = %e, "Failed to restore reminder schedules");
    }

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        blobs,
        scheduler,
        clock,
    });

    // Build router
    let app = pulse_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pulse_tracker=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}
