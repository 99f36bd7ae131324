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
use chrono::{DateTime, Duration, Utc};
use freesleep_types::{FreeSleepOptions, Side, VitalsCache, VitalsMode};
use tracing::debug;

use crate::traits::DeviceDataSource;

/// Decide whether the current refresh cycle has to refetch vitals.
///
/// A cache computed over a different window than the configured one is
/// always refetched. Otherwise polling mode refetches once the cache is at
/// least `vitals_poll_secs` old, and nightly mode leaves it to the nightly timer.
pub fn needs_refresh(
    options: &FreeSleepOptions,
    cache: Option<&VitalsCache>,
    now: DateTime<Utc>,
) -> bool {
    if !options.fetch_vitals {
        return false;
    }
    let Some(cache) = cache else {
        return true;
    };
    if !cache.matches_window(options.vitals_window_hours) {
        debug!(
            cached = cache.window_hours,
            configured = options.vitals_window_hours,
            "Vitals window changed"
        );
        return true;
    }

    match options.vitals_mode {
        VitalsMode::Nightly => false,
        VitalsMode::Polling => {
            let max_age =
                Duration::seconds(i64::try_from(options.vitals_poll_secs).unwrap_or(i64::MAX));
            cache.age(now) >= max_age
        }
    }
}

/// Fetch summaries for both sides, one after the other
pub async fn fetch_vitals(
    source: &dyn DeviceDataSource,
    window_hours: u32,
    now: DateTime<Utc>,
) -> Result<VitalsCache> {
    let start = now - Duration::hours(i64::from(window_hours));
    debug!(window_hours, %start, end = %now, "Fetching vitals summaries");

    let left = source
        .fetch_vitals_summary(Side::Left, start, now)
        .await
        .context("Failed to fetch left vitals summary")?;
    let right = source
        .fetch_vitals_summary(Side::Right, start, now)
        .await
        .context("Failed to fetch right vitals summary")?;

    Ok(VitalsCache {
        left,
        right,
        window_hours,
        fetched_at: now,
    })
}
