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

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use freesleep_types::NightlyTime;
use futures_timer::Delay;
use std::future::Future;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::coordinator::Coordinator;

/// Wall-clock timer that refreshes vitals once a day at a fixed local time
#[derive(Debug)]
pub struct NightlyVitalsTimer {
    handle: JoinHandle<()>,
}

impl NightlyVitalsTimer {
    pub fn spawn(coordinator: Weak<Coordinator>, time: NightlyTime) -> Self {
        let handle = tokio::spawn(async move {
            info!(%time, "🌙 Nightly vitals refresh scheduled");
            run(coordinator, move || delay_until(&Local::now(), time), Delay::new).await;
        });
        Self { handle }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn cancel(self) -> JoinHandle<()> {
        self.handle.abort();
        self.handle
    }
}

/// Wait `next_delay()` with `sleep`, refresh vitals, repeat.
///
/// Exits once the coordinator is gone. A failed refresh waits for the next
/// firing.
async fn run<D, S, F>(coordinator: Weak<Coordinator>, mut next_delay: D, mut sleep: S)
where
    D: FnMut() -> Duration,
    S: FnMut(Duration) -> F,
    F: Future<Output = ()>,
{
    loop {
        sleep(next_delay()).await;

        let Some(coordinator) = coordinator.upgrade() else {
            debug!("Coordinator dropped, nightly vitals timer stopping");
            break;
        };
        if coordinator.refresh_vitals().await.is_err() {
            debug!("Nightly vitals refresh failed, retrying tomorrow");
        }
    }
}

fn delay_until<Tz: TimeZone>(now: &DateTime<Tz>, time: NightlyTime) -> Duration
where
    Tz::Offset: std::fmt::Display,
{
    let next = next_run_after(now, time);
    let delay = (next.clone() - now.clone())
        .to_std()
        .unwrap_or(Duration::from_secs(3600));

    debug!(
        "Nightly vitals: sleeping until {} ({} seconds)",
        next.format("%Y-%m-%d %H:%M:%S"),
        delay.as_secs()
    );
    delay
}

/// Next occurrence of `time` strictly after `now`, in `now`'s time zone.
///
/// A time that does not exist on a given day (DST gap) moves to the next day;
/// an ambiguous one resolves to its earlier instant.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, time: NightlyTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let target = time.as_naive_time();
    let mut date = now.date_naive();

    for _ in 0..3 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(target)).earliest()
            && candidate > *now
        {
            return candidate;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    now.clone() + ChronoDuration::hours(24)
}
