// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Pulse: personal habit tracker backend
//!
//! This crate provides the HTTP API behind the Pulse web client: daily
//! journal entries, weekly weigh-ins with progress photos, streaks and
//! completion rates, a filterable log with CSV export, a PIN gate, and
//! daily reminders.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::HabitStore;
use services::{BlobStore, IdentityProvider, NotificationScheduler};
use std::sync::Arc;
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn HabitStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Arc<dyn BlobStore>,
    pub scheduler: Arc<NotificationScheduler>,
    pub clock: Arc<dyn Clock>,
}
