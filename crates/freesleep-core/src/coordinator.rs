// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FreeSleep Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use anyhow::{Context, Result};
use chrono::Utc;
use freesleep_types::{FreeSleepOptions, JsonObject, Snapshot};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::IntegrationContext;
use crate::nightly::NightlyVitalsTimer;
use crate::scheduler::RefreshTimer;
use crate::traits::WriteTarget;
use crate::vitals;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Notification sent to subscribers after every refresh or local patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// The snapshot changed (fresh poll or optimistic write)
    Updated,
    /// A refresh failed; the previous snapshot is still in place
    UpdateFailed { reason: String },
}

/// Owns the device snapshot and the timers that keep it fresh.
///
/// Reads never block on I/O: entities borrow the last-known-good snapshot
/// through [`Coordinator::with_snapshot`] while refreshes run in the background.
pub struct Coordinator {
    context: Arc<IntegrationContext>,
    snapshot: RwLock<Snapshot>,
    last_update_success: AtomicBool,
    events: broadcast::Sender<CoordinatorEvent>,
    timer: Mutex<Option<RefreshTimer>>,
    nightly: Mutex<Option<NightlyVitalsTimer>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl Coordinator {
    pub fn new(context: Arc<IntegrationContext>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            context,
            snapshot: RwLock::new(Snapshot::default()),
            last_update_success: AtomicBool::new(false),
            events,
            timer: Mutex::new(None),
            nightly: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn context(&self) -> &Arc<IntegrationContext> {
        &self.context
    }

    /// Clone of the current snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    /// Run `f` against the current snapshot without cloning it
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        f(&self.snapshot.read())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Whether the most recent refresh succeeded
    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::Acquire)
    }

    /// Run one refresh cycle.
    ///
    /// Device status, settings, vitals (when due) and presence (when enabled)
    /// are fetched in that order. The first failure aborts the cycle and the
    /// previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;

        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                *self.snapshot.write() = snapshot;
                self.last_update_success.store(true, Ordering::Release);
                debug!(entry_id = %self.context.entry_id(), "Snapshot refreshed");
                self.notify(CoordinatorEvent::Updated);
                Ok(())
            }
            Err(e) => {
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let options = self.context.options();
        let source = self.context.source();

        let device_status = source
            .fetch_device_status()
            .await
            .context("Failed to fetch device status")?;
        let settings = source
            .fetch_settings()
            .await
            .context("Failed to fetch settings")?;

        let now = Utc::now();
        let cached = self.snapshot.read().vitals.clone();
        let vitals = if !options.fetch_vitals {
            None
        } else if vitals::needs_refresh(&options, cached.as_ref(), now) {
            Some(
                vitals::fetch_vitals(source.as_ref(), options.vitals_window_hours, now).await?,
            )
        } else {
            cached
        };

        let presence = if options.fetch_presence {
            Some(
                source
                    .fetch_presence()
                    .await
                    .context("Failed to fetch presence")?,
            )
        } else {
            None
        };

        Ok(Snapshot {
            device_status,
            settings,
            presence,
            vitals,
        })
    }

    /// Refetch only the vitals summaries and patch them into the snapshot
    pub async fn refresh_vitals(&self) -> Result<()> {
        let options = self.context.options();
        if !options.fetch_vitals {
            return Ok(());
        }
        let _guard = self.refresh_lock.lock().await;

        let result = vitals::fetch_vitals(
            self.context.source().as_ref(),
            options.vitals_window_hours,
            Utc::now(),
        )
        .await;

        match result {
            Ok(cache) => {
                // Availability follows the main poll only
                self.snapshot.write().vitals = Some(cache);
                info!(
                    window_hours = options.vitals_window_hours,
                    "🌙 Nightly vitals refreshed"
                );
                self.notify(CoordinatorEvent::Updated);
                Ok(())
            }
            Err(e) => {
                self.report_failure(&e);
                Err(e)
            }
        }
    }

    /// Optimistically apply a write.
    ///
    /// The payload is merged into the local section and subscribers are told
    /// before the POST is even sent. The POST runs in the background; a
    /// failure is only logged and the deferred re-poll brings back the
    /// device's real state.
    pub fn apply_write(self: &Arc<Self>, target: WriteTarget, payload: JsonObject) {
        self.snapshot.write().patch(target.section(), &payload);
        self.notify(CoordinatorEvent::Updated);

        let source = Arc::clone(self.context.source());
        tokio::spawn(async move {
            debug!(?target, ?payload, "Sending write");
            if let Err(e) = source.write(target, payload).await {
                warn!(?target, error = %format!("{e:#}"), "Write failed, local state kept until next poll");
            }
        });

        self.defer_refresh();
    }

    /// Pull the next scheduled poll forward to `write_refresh_delay`
    pub fn defer_refresh(&self) {
        let delay = self.context.options().write_refresh_delay();
        match self.timer.lock().as_ref() {
            Some(timer) => timer.reschedule(delay),
            None => debug!("Refresh timer not running, nothing to defer"),
        }
    }

    /// Start the polling timer and, in nightly mode, the nightly vitals timer.
    ///
    /// The first poll is due one update interval from now; callers that want
    /// data right away run [`Coordinator::refresh`] first.
    pub fn start(self: &Arc<Self>) {
        let options = self.context.options();
        let interval = options.update_interval();

        let timer = RefreshTimer::spawn(
            Arc::downgrade(self),
            options.refresh_mode,
            interval,
            interval,
        );
        if let Some(previous) = self.timer.lock().replace(timer) {
            previous.abort();
        }

        let nightly = options
            .uses_nightly_vitals()
            .then(|| NightlyVitalsTimer::spawn(Arc::downgrade(self), options.nightly_time()));
        if let Some(previous) = std::mem::replace(&mut *self.nightly.lock(), nightly) {
            previous.abort();
        }

        info!(
            entry_id = %self.context.entry_id(),
            mode = options.refresh_mode.as_str(),
            interval_secs = options.update_interval_secs,
            vitals_mode = options.vitals_mode.as_str(),
            "Coordinator started"
        );
    }

    /// Whether the polling timer is running
    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Cancel both timers and wait for their tasks to wind down
    pub async fn shutdown(&self) {
        let timer = self.timer.lock().take();
        let nightly = self.nightly.lock().take();

        let handles: Vec<JoinHandle<()>> = timer
            .map(RefreshTimer::cancel)
            .into_iter()
            .chain(nightly.map(NightlyVitalsTimer::cancel))
            .collect();

        for handle in handles {
            match handle.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => warn!(error = %e, "Timer task ended abnormally"),
            }
        }
        debug!(entry_id = %self.context.entry_id(), "Coordinator stopped");
    }

    /// Replace the options and restart the timers if they were running
    pub async fn update_options(self: &Arc<Self>, options: FreeSleepOptions) {
        self.context.set_options(options);
        if self.is_running() {
            self.shutdown().await;
            self.start();
        }
    }

    fn report_failure(&self, e: &anyhow::Error) {
        let reason = format!("{e:#}");
        warn!(entry_id = %self.context.entry_id(), error = %reason, "Refresh failed, keeping last snapshot");
        self.last_update_success.store(false, Ordering::Release);
        self.notify(CoordinatorEvent::UpdateFailed { reason });
    }

    fn notify(&self, event: CoordinatorEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("context", &self.context)
            .field("last_update_success", &self.last_update_success())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
