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

//! Timer driving the periodic refresh

use freesleep_types::RefreshMode;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use crate::coordinator::Coordinator;

/// Handle to the background refresh task.
///
/// In [`RefreshMode::Delay`] the next poll is due `interval` after the
/// previous one finished, and [`RefreshTimer::reschedule`] replaces that
/// deadline. In [`RefreshMode::Interval`] polls follow a fixed grid (missed
/// ticks are skipped) and a reschedule adds a one-off extra poll.
#[derive(Debug)]
pub struct RefreshTimer {
    commands: mpsc::UnboundedSender<Duration>,
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    /// Spawn the task. The first poll happens after `initial_delay`.
    ///
    /// The task holds only a weak reference and exits once the coordinator
    /// is dropped.
    pub fn spawn(
        coordinator: Weak<Coordinator>,
        mode: RefreshMode,
        interval: Duration,
        initial_delay: Duration,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(coordinator, mode, interval, initial_delay, receiver));
        Self { commands, handle }
    }

    /// Cancel the pending wait and poll again after `delay`
    pub fn reschedule(&self, delay: Duration) {
        if self.commands.send(delay).is_err() {
            debug!("Refresh timer already stopped");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Abort the task and hand back its join handle
    pub fn cancel(self) -> JoinHandle<()> {
        self.handle.abort();
        self.handle
    }
}

async fn run(
    coordinator: Weak<Coordinator>,
    mode: RefreshMode,
    interval: Duration,
    initial_delay: Duration,
    mut commands: mpsc::UnboundedReceiver<Duration>,
) {
    let mut next = Instant::now() + initial_delay;
    let mut deferred: Option<Instant> = None;

    loop {
        let deadline = deferred.map_or(next, |at| at.min(next));

        tokio::select! {
            () = sleep_until(deadline) => {}
            command = commands.recv() => {
                let Some(delay) = command else {
                    break;
                };
                let at = Instant::now() + delay;
                match mode {
                    RefreshMode::Delay => next = at,
                    RefreshMode::Interval => deferred = Some(at),
                }
                debug!(delay_ms = delay.as_millis(), "Refresh rescheduled");
                continue;
            }
        }

        let fired_at = Instant::now();
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        if coordinator.refresh().await.is_err() {
            debug!("Scheduled refresh failed");
        }
        drop(coordinator);

        match mode {
            RefreshMode::Delay => next = Instant::now() + interval,
            RefreshMode::Interval => {
                if deferred.is_some_and(|at| at <= fired_at) {
                    deferred = None;
                }
                next = next_grid_tick(next, interval, Instant::now());
            }
        }
    }

    debug!("Refresh timer stopped");
}

/// First tick of the grid `start + k * interval` that lies after `now`
fn next_grid_tick(start: Instant, interval: Duration, now: Instant) -> Instant {
    if start > now {
        return start;
    }
    if interval.is_zero() {
        return now;
    }
    let behind = now.duration_since(start).as_nanos();
    let step = interval.as_nanos();
    let ticks = u32::try_from(behind / step + 1).unwrap_or(u32::MAX);
    start + interval * ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::coordinator_with;
    use freesleep_types::FreeSleepOptions;
    use std::sync::Arc;
    use tokio::time::sleep;

    const INTERVAL: Duration = Duration::from_secs(15);

    fn options(mode: RefreshMode) -> FreeSleepOptions {
        FreeSleepOptions {
            refresh_mode: mode,
            fetch_vitals: false,
            ..FreeSleepOptions::default()
        }
    }

    #[test]
    fn test_next_grid_tick_skips_missed_ticks() {
        let start = Instant::now();
        let now = start + Duration::from_secs(47);
        assert_eq!(
            next_grid_tick(start, INTERVAL, now),
            start + Duration::from_secs(60)
        );
        assert_eq!(
            next_grid_tick(start, INTERVAL, start + INTERVAL),
            start + Duration::from_secs(30)
        );
        let future = start + Duration::from_secs(100);
        assert_eq!(next_grid_tick(future, INTERVAL, now), future);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_mode_polls_after_interval() {
        let (coordinator, source) = coordinator_with(options(RefreshMode::Delay));
        let timer =
            RefreshTimer::spawn(Arc::downgrade(&coordinator), RefreshMode::Delay, INTERVAL, INTERVAL);

        sleep(Duration::from_secs(14)).await;
        assert_eq!(source.device_status_fetches(), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.device_status_fetches(), 1);

        sleep(Duration::from_secs(15)).await;
        assert_eq!(source.device_status_fetches(), 2);

        drop(timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_pulls_poll_forward_in_delay_mode() {
        let (coordinator, source) = coordinator_with(options(RefreshMode::Delay));
        let timer =
            RefreshTimer::spawn(Arc::downgrade(&coordinator), RefreshMode::Delay, INTERVAL, INTERVAL);

        sleep(Duration::from_secs(1)).await;
        timer.reschedule(Duration::from_secs(2));

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(source.device_status_fetches(), 1);

        // Next poll is a full interval after the deferred one, at t=18
        sleep(Duration::from_secs(13)).await;
        assert_eq!(source.device_status_fetches(), 1);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.device_status_fetches(), 2);

        drop(timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_deadline() {
        let (coordinator, source) = coordinator_with(options(RefreshMode::Delay));
        let timer =
            RefreshTimer::spawn(Arc::downgrade(&coordinator), RefreshMode::Delay, INTERVAL, INTERVAL);

        // Repeated writes keep pushing the poll back
        for _ in 0..5 {
            timer.reschedule(Duration::from_secs(2));
            sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(source.device_status_fetches(), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(source.device_status_fetches(), 1);

        drop(timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_mode_keeps_grid_after_reschedule() {
        let (coordinator, source) = coordinator_with(options(RefreshMode::Interval));
        let timer = RefreshTimer::spawn(
            Arc::downgrade(&coordinator),
            RefreshMode::Interval,
            INTERVAL,
            INTERVAL,
        );

        sleep(Duration::from_secs(1)).await;
        timer.reschedule(Duration::from_secs(2));

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(source.device_status_fetches(), 1);

        // Grid tick at t=15 still happens
        sleep(Duration::from_secs(12)).await;
        assert_eq!(source.device_status_fetches(), 2);

        sleep(Duration::from_secs(15)).await;
        assert_eq!(source.device_status_fetches(), 3);

        drop(timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_does_not_stop_timer() {
        let (coordinator, source) = coordinator_with(options(RefreshMode::Delay));
        source.fail_device_status(true);
        let timer =
            RefreshTimer::spawn(Arc::downgrade(&coordinator), RefreshMode::Delay, INTERVAL, INTERVAL);

        sleep(Duration::from_secs(31)).await;
        assert_eq!(source.device_status_fetches(), 2);
        assert!(!timer.is_finished());

        drop(timer.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_exits_when_coordinator_dropped() {
        let (coordinator, _source) = coordinator_with(options(RefreshMode::Delay));
        let timer =
            RefreshTimer::spawn(Arc::downgrade(&coordinator), RefreshMode::Delay, INTERVAL, INTERVAL);
        drop(coordinator);

        sleep(Duration::from_secs(16)).await;
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_task_reports_cancellation() {
        let (coordinator, _source) = coordinator_with(options(RefreshMode::Delay));
        let timer =
            RefreshTimer::spawn(Arc::downgrade(&coordinator), RefreshMode::Delay, INTERVAL, INTERVAL);

        let result = timer.cancel().await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
