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

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::side::Side;
use crate::snapshot::JsonObject;

/// Biometric summaries for both sides over a trailing window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsCache {
    pub left: JsonObject,
    pub right: JsonObject,
    /// Length of the window the summaries were computed over
    pub window_hours: u32,
    pub fetched_at: DateTime<Utc>,
}

impl VitalsCache {
    pub fn side(&self, side: Side) -> &JsonObject {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.fetched_at)
    }

    pub fn matches_window(&self, window_hours: u32) -> bool {
        self.window_hours == window_hours
    }
}
