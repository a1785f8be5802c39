// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily reminder scheduler.
//!
//! Each user is in one of three states:
//! - `Disabled`: nothing pending.
//! - `ScheduledNative`: one Cloud Tasks delivery is queued; when it calls
//!   back, the reminder fires and the next day's task is queued.
//! - `ScheduledFallback`: an in-process timer sleeps until the next
//!   occurrence and re-arms itself, backed by a one-minute poller that fires
//!   whenever the wall clock is inside the reminder minute.
//!
//! Every delivery path goes through [`NotificationScheduler::fire`], which is
//! serialized per user and deduplicated by the persisted `lastFiredDate`, so
//! at most one reminder is delivered per user per calendar day.

use crate::db::HabitStore;
use crate::error::AppError;
use crate::models::NotificationSettings;
use crate::services::notifier::{Notifier, Reminder};
use crate::services::tasks::NativeTrigger;
use crate::time_utils::{date_id, Clock, ReminderTime};
use chrono::NaiveDateTime;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};

pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

pub const NATIVE_DISCLAIMER: &str =
    "Notifications are scheduled with your OS and will be delivered even if the browser is closed.";
pub const FALLBACK_DISCLAIMER: &str =
    "Your browser must have this page open in a tab for the notification to be delivered.";
pub const PERMISSION_DENIED: &str =
    "Notification permission was denied. Please enable notifications to receive reminders.";

/// Where a user's next reminder will come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SchedulerState {
    Disabled,
    ScheduledNative { next_fire: NaiveDateTime },
    ScheduledFallback { next_fire: NaiveDateTime },
}

enum Armed {
    Native {
        next_fire: NaiveDateTime,
    },
    Fallback {
        time: ReminderTime,
        timer: JoinHandle<()>,
        poller: JoinHandle<()>,
    },
}

impl Drop for Armed {
    fn drop(&mut self) {
        if let Armed::Fallback { timer, poller, .. } = self {
            timer.abort();
            poller.abort();
        }
    }
}

pub struct NotificationScheduler {
    db: Arc<dyn HabitStore>,
    notifier: Arc<dyn Notifier>,
    native: Option<Arc<dyn NativeTrigger>>,
    clock: Arc<dyn Clock>,
    default_time: ReminderTime,
    armed: DashMap<String, Armed>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NotificationScheduler {
    pub fn new(
        db: Arc<dyn HabitStore>,
        notifier: Arc<dyn Notifier>,
        native: Option<Arc<dyn NativeTrigger>>,
        clock: Arc<dyn Clock>,
        default_time: ReminderTime,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            notifier,
            native,
            clock,
            default_time,
            armed: DashMap::new(),
            locks: DashMap::new(),
        })
    }

    /// Whether reminders can be delivered with the page closed.
    pub fn native_available(&self) -> bool {
        self.native.is_some()
    }

    pub fn disclaimer(&self) -> &'static str {
        if self.native_available() {
            NATIVE_DISCLAIMER
        } else {
            FALLBACK_DISCLAIMER
        }
    }

    fn user_lock(&self, uid: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Stored settings, or defaults for a user who never saved any.
    pub async fn settings(&self, uid: &str) -> Result<NotificationSettings, AppError> {
        Ok(self
            .db
            .get_notification_settings(uid)
            .await?
            .unwrap_or_else(|| NotificationSettings::new(uid, self.default_time)))
    }

    /// Current in-memory state for `uid`.
    pub fn state(&self, uid: &str) -> SchedulerState {
        match self.armed.get(uid).as_deref() {
            None => SchedulerState::Disabled,
            Some(Armed::Native { next_fire }) => SchedulerState::ScheduledNative {
                next_fire: *next_fire,
            },
            Some(Armed::Fallback { time, .. }) => SchedulerState::ScheduledFallback {
                next_fire: time.next_occurrence(self.clock.now()),
            },
        }
    }

    /// Turn reminders on at `time`, replacing any existing schedule.
    pub async fn enable(
        self: &Arc<Self>,
        uid: &str,
        time: ReminderTime,
    ) -> Result<SchedulerState, AppError> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;

        if !self.notifier.request_permission(uid).await? {
            tracing::info!(uid, "Reminder permission denied");
            self.disarm(uid).await?;
            return Err(AppError::Notification(PERMISSION_DENIED.to_string()));
        }

        let mut settings = self.disarm(uid).await?;
        settings.enabled = true;
        settings.time = time;
        self.arm(&mut settings).await;
        self.db.set_notification_settings(&settings).await?;

        tracing::info!(uid, time = %time, "Reminders enabled");
        Ok(self.state(uid))
    }

    /// Turn reminders off and cancel anything pending.
    pub async fn disable(self: &Arc<Self>, uid: &str) -> Result<(), AppError> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;
        self.disarm(uid).await?;
        tracing::info!(uid, "Reminders disabled");
        Ok(())
    }

    /// Cancel the in-process tasks and the native trigger, persisting
    /// `enabled = false`. Caller holds the user lock.
    async fn disarm(&self, uid: &str) -> Result<NotificationSettings, AppError> {
        // Dropping the entry aborts timer and poller.
        self.armed.remove(uid);

        let mut settings = self.settings(uid).await?;
        if let (Some(native), Some(name)) = (&self.native, settings.native_task_name.take()) {
            if let Err(e) = native.cancel(&name).await {
                tracing::warn!(uid, task = %name, error = %e, "Failed to cancel reminder task");
            }
        }
        settings.enabled = false;
        self.db.set_notification_settings(&settings).await?;
        Ok(settings)
    }

    /// Schedule the next delivery, preferring the native trigger.
    /// Caller holds the user lock and persists `settings` afterwards.
    async fn arm(self: &Arc<Self>, settings: &mut NotificationSettings) {
        let uid = settings.uid.clone();
        let next_fire = settings.time.next_occurrence(self.clock.now());

        if let Some(native) = &self.native {
            if let Some(previous) = settings.native_task_name.take() {
                if let Err(e) = native.cancel(&previous).await {
                    tracing::warn!(uid = %uid, task = %previous, error = %e, "Failed to cancel reminder task");
                }
            }
            match native.schedule(&uid, next_fire).await {
                Ok(name) => {
                    settings.native_task_name = Some(name);
                    self.armed.insert(uid, Armed::Native { next_fire });
                    return;
                }
                Err(e) => {
                    tracing::warn!(uid = %uid, error = %e, "Native scheduling failed, using in-process timer");
                }
            }
        }

        let armed = Armed::Fallback {
            time: settings.time,
            timer: self.spawn_timer(&uid, settings.time),
            poller: self.spawn_poller(&uid, settings.time),
        };
        self.armed.insert(uid, armed);
    }

    fn spawn_timer(self: &Arc<Self>, uid: &str, time: ReminderTime) -> JoinHandle<()> {
        let scheduler: Weak<Self> = Arc::downgrade(self);
        let clock = Arc::clone(&self.clock);
        let uid = uid.to_string();
        tokio::spawn(async move {
            loop {
                let now = clock.now();
                let wait = (time.next_occurrence(now) - now)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;

                let Some(scheduler) = scheduler.upgrade() else {
                    return;
                };
                if let Err(e) = scheduler.fire(&uid).await {
                    tracing::warn!(uid = %uid, error = %e, "Timer reminder failed");
                }
            }
        })
    }

    fn spawn_poller(self: &Arc<Self>, uid: &str, time: ReminderTime) -> JoinHandle<()> {
        let scheduler: Weak<Self> = Arc::downgrade(self);
        let clock = Arc::clone(&self.clock);
        let uid = uid.to_string();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !time.matches_minute(clock.now()) {
                    continue;
                }
                let Some(scheduler) = scheduler.upgrade() else {
                    return;
                };
                if let Err(e) = scheduler.fire(&uid).await {
                    tracing::warn!(uid = %uid, error = %e, "Polled reminder failed");
                }
            }
        })
    }

    /// Deliver today's reminder unless it was already delivered.
    ///
    /// Returns whether a reminder was sent.
    pub async fn fire(&self, uid: &str) -> Result<bool, AppError> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;
        self.fire_locked(uid).await
    }

    /// [`Self::fire`] for a caller that already holds the user lock.
    async fn fire_locked(&self, uid: &str) -> Result<bool, AppError> {
        let mut settings = self.settings(uid).await?;
        if !settings.enabled {
            return Ok(false);
        }

        let today = date_id(self.clock.today());
        if settings.last_fired_date.as_deref() == Some(today.as_str()) {
            tracing::debug!(uid, date = %today, "Reminder already delivered today");
            return Ok(false);
        }

        self.notifier.deliver(uid, &Reminder::default()).await?;
        settings.last_fired_date = Some(today);
        self.db.set_notification_settings(&settings).await?;
        Ok(true)
    }

    /// Native trigger `task` came back: fire, then queue the next day's
    /// trigger.
    ///
    /// Only the task recorded as current may do this. Callbacks from any
    /// other task are ignored, so queue retries never add a second pending
    /// task. The next task is queued even when delivery fails.
    pub async fn handle_native_trigger(
        self: &Arc<Self>,
        uid: &str,
        task: &str,
    ) -> Result<bool, AppError> {
        let lock = self.user_lock(uid);
        let _guard = lock.lock().await;

        let current = self.settings(uid).await?;
        if !current.enabled || current.native_task_name.as_deref() != Some(task) {
            tracing::info!(uid, task, "Ignoring callback from stale reminder task");
            return Ok(false);
        }

        let fired = match self.fire_locked(uid).await {
            Ok(fired) => fired,
            Err(e) => {
                tracing::warn!(uid, task, error = %e, "Reminder delivery failed");
                false
            }
        };

        // Arming cancels the calling task, which also stops queue retries.
        let mut settings = self.settings(uid).await?;
        self.armed.remove(uid);
        self.arm(&mut settings).await;
        self.db.set_notification_settings(&settings).await?;
        Ok(fired)
    }

    /// Re-arm every user whose stored settings are enabled.
    pub async fn restore(self: &Arc<Self>) -> Result<usize, AppError> {
        let enabled = self.db.list_enabled_notification_settings().await?;
        let count = enabled.len();
        for mut settings in enabled {
            let lock = self.user_lock(&settings.uid);
            let _guard = lock.lock().await;
            self.armed.remove(&settings.uid);
            self.arm(&mut settings).await;
            if let Err(e) = self.db.set_notification_settings(&settings).await {
                tracing::warn!(uid = %settings.uid, error = %e, "Failed to persist restored reminder");
            }
        }
        tracing::info!(count, "Restored reminder schedules");
        Ok(count)
    }

    /// Whether any timer, poller or native trigger is pending for `uid`.
    pub fn has_pending(&self, uid: &str) -> bool {
        self.armed.contains_key(uid)
    }
}
