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

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::error::{TypesError, TypesResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost";
pub const DEFAULT_PORT: u16 = 3000;

pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 15;
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 5;
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 3600;

pub const DEFAULT_VITALS_WINDOW_HOURS: u32 = 24;
pub const MIN_VITALS_WINDOW_HOURS: u32 = 1;
pub const MAX_VITALS_WINDOW_HOURS: u32 = 168;

pub const DEFAULT_VITALS_POLL_SECS: u64 = 900;
pub const MIN_VITALS_POLL_SECS: u64 = 60;
pub const MAX_VITALS_POLL_SECS: u64 = 86400;

pub const DEFAULT_WRITE_REFRESH_DELAY_SECS: u64 = 2;
pub const MIN_WRITE_REFRESH_DELAY_SECS: u64 = 1;
pub const MAX_WRITE_REFRESH_DELAY_SECS: u64 = 60;

pub const DEFAULT_NIGHTLY_TIME: NightlyTime = NightlyTime { hour: 2, minute: 0 };

/// How vitals are kept up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VitalsMode {
    /// Refetched by the main refresh cycle once the cache is older than `vitals_poll_secs`
    #[default]
    Polling,
    /// Refetched once a day at `nightly_time`
    Nightly,
}

impl VitalsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Nightly => "nightly",
        }
    }
}

impl FromStr for VitalsMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "polling" => Ok(Self::Polling),
            "nightly" => Ok(Self::Nightly),
            _ => Err(TypesError::UnknownVariant {
                kind: "vitals mode",
                value: s.to_owned(),
            }),
        }
    }
}

/// Scheduling strategy of the main refresh loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Fixed ticks every `update_interval_secs`, regardless of refresh duration
    Interval,
    /// Next refresh is scheduled `update_interval_secs` after the previous one completes
    #[default]
    Delay,
}

impl RefreshMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Delay => "delay",
        }
    }
}

impl FromStr for RefreshMode {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interval" => Ok(Self::Interval),
            "delay" => Ok(Self::Delay),
            _ => Err(TypesError::UnknownVariant {
                kind: "refresh mode",
                value: s.to_owned(),
            }),
        }
    }
}

/// Local wall-clock time of the nightly vitals refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NightlyTime {
    hour: u32,
    minute: u32,
}

impl NightlyTime {
    pub const fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// Parse a strict `HH:MM` (or `H:MM`) string
    pub fn parse(s: &str) -> TypesResult<Self> {
        let invalid = || TypesError::InvalidNightlyTime(s.to_owned());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;

        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
            return Err(invalid());
        }

        let hour = hour.parse::<u32>().map_err(|_| invalid())?;
        let minute = minute.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }

    /// Parse, falling back to 02:00 when the string is malformed
    pub fn parse_or_default(s: &str) -> Self {
        match Self::parse(s) {
            Ok(time) => time,
            Err(e) => {
                warn!(error = %e, fallback = %DEFAULT_NIGHTLY_TIME, "Using fallback nightly time");
                DEFAULT_NIGHTLY_TIME
            }
        }
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }

    pub fn as_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for NightlyTime {
    fn default() -> Self {
        DEFAULT_NIGHTLY_TIME
    }
}

impl fmt::Display for NightlyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A value that was changed while normalizing options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionAdjustment {
    pub field: &'static str,
    pub from: String,
    pub to: String,
}

/// Per-device options, the equivalent of a config entry plus its options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FreeSleepOptions {
    /// Base URL of the device, without the port (e.g. `http://192.168.1.50`)
    pub base_url: String,
    pub port: u16,
    pub update_interval_secs: u64,
    pub refresh_mode: RefreshMode,
    /// Delay before the re-poll that follows a write
    pub write_refresh_delay_secs: u64,
    pub fetch_presence: bool,
    pub fetch_vitals: bool,
    pub vitals_mode: VitalsMode,
    pub vitals_window_hours: u32,
    pub vitals_poll_secs: u64,
    /// Raw `HH:MM` string, parsed leniently by [`FreeSleepOptions::nightly_time`]
    pub nightly_time: String,
}

impl Default for FreeSleepOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            port: DEFAULT_PORT,
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            refresh_mode: RefreshMode::default(),
            write_refresh_delay_secs: DEFAULT_WRITE_REFRESH_DELAY_SECS,
            fetch_presence: true,
            fetch_vitals: true,
            vitals_mode: VitalsMode::default(),
            vitals_window_hours: DEFAULT_VITALS_WINDOW_HOURS,
            vitals_poll_secs: DEFAULT_VITALS_POLL_SECS,
            nightly_time: DEFAULT_NIGHTLY_TIME.to_string(),
        }
    }
}

impl FreeSleepOptions {
    /// Clamp every value into its valid range, independently of the others.
    ///
    /// Returns the list of values that had to be changed.
    pub fn normalize(&mut self) -> Vec<OptionAdjustment> {
        let mut adjustments = Vec::new();

        let trimmed = self.base_url.trim().trim_end_matches('/').to_owned();
        if trimmed != self.base_url {
            adjustments.push(OptionAdjustment {
                field: "base_url",
                from: self.base_url.clone(),
                to: trimmed.clone(),
            });
            self.base_url = trimmed;
        }

        if self.port == 0 {
            adjustments.push(OptionAdjustment {
                field: "port",
                from: "0".to_owned(),
                to: DEFAULT_PORT.to_string(),
            });
            self.port = DEFAULT_PORT;
        }

        clamp_field(
            "update_interval_secs",
            &mut self.update_interval_secs,
            MIN_UPDATE_INTERVAL_SECS,
            MAX_UPDATE_INTERVAL_SECS,
            &mut adjustments,
        );
        clamp_field(
            "write_refresh_delay_secs",
            &mut self.write_refresh_delay_secs,
            MIN_WRITE_REFRESH_DELAY_SECS,
            MAX_WRITE_REFRESH_DELAY_SECS,
            &mut adjustments,
        );
        clamp_field(
            "vitals_window_hours",
            &mut self.vitals_window_hours,
            MIN_VITALS_WINDOW_HOURS,
            MAX_VITALS_WINDOW_HOURS,
            &mut adjustments,
        );
        clamp_field(
            "vitals_poll_secs",
            &mut self.vitals_poll_secs,
            MIN_VITALS_POLL_SECS,
            MAX_VITALS_POLL_SECS,
            &mut adjustments,
        );

        let nightly = NightlyTime::parse_or_default(&self.nightly_time).to_string();
        if nightly != self.nightly_time {
            adjustments.push(OptionAdjustment {
                field: "nightly_time",
                from: self.nightly_time.clone(),
                to: nightly.clone(),
            });
            self.nightly_time = nightly;
        }

        for adjustment in &adjustments {
            warn!(
                field = adjustment.field,
                from = %adjustment.from,
                to = %adjustment.to,
                "Option out of range, adjusted"
            );
        }

        adjustments
    }

    /// Normalized copy of these options
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.normalize();
        self
    }

    /// Base URL with the port appended, e.g. `http://192.168.1.50:3000`
    pub fn endpoint(&self) -> String {
        format!(
            "{}:{}",
            self.base_url.trim().trim_end_matches('/'),
            self.port
        )
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn write_refresh_delay(&self) -> Duration {
        Duration::from_secs(self.write_refresh_delay_secs)
    }

    pub fn nightly_time(&self) -> NightlyTime {
        NightlyTime::parse_or_default(&self.nightly_time)
    }

    /// Whether a dedicated nightly timer should drive vitals refreshes
    pub fn uses_nightly_vitals(&self) -> bool {
        self.fetch_vitals && self.vitals_mode == VitalsMode::Nightly
    }
}

fn clamp_field<T>(
    field: &'static str,
    value: &mut T,
    min: T,
    max: T,
    adjustments: &mut Vec<OptionAdjustment>,
) where
    T: PartialOrd + Copy + fmt::Display,
{
    let clamped = if *value < min {
        min
    } else if *value > max {
        max
    } else {
        return;
    };
    adjustments.push(OptionAdjustment {
        field,
        from: value.to_string(),
        to: clamped.to_string(),
    });
    *value = clamped;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_already_normal() {
        let mut options = FreeSleepOptions::default();
        assert!(options.normalize().is_empty());
        assert_eq!(options.endpoint(), "http://localhost:3000");
    }

    #[test]
    fn test_each_value_clamped_independently() {
        let mut options = FreeSleepOptions {
            update_interval_secs: 1,
            vitals_window_hours: 500,
            vitals_poll_secs: 900,
            write_refresh_delay_secs: 0,
            ..Default::default()
        };
        let adjustments = options.normalize();

        assert_eq!(options.update_interval_secs, MIN_UPDATE_INTERVAL_SECS);
        assert_eq!(options.vitals_window_hours, MAX_VITALS_WINDOW_HOURS);
        assert_eq!(options.vitals_poll_secs, 900);
        assert_eq!(options.write_refresh_delay_secs, MIN_WRITE_REFRESH_DELAY_SECS);

        let fields: Vec<_> = adjustments.iter().map(|a| a.field).collect();
        assert_eq!(
            fields,
            vec![
                "update_interval_secs",
                "write_refresh_delay_secs",
                "vitals_window_hours"
            ]
        );
    }

    #[test]
    fn test_upper_bounds() {
        let options = FreeSleepOptions {
            update_interval_secs: 10_000,
            vitals_window_hours: 0,
            vitals_poll_secs: 1_000_000,
            port: 0,
            ..Default::default()
        }
        .clamped();

        assert_eq!(options.update_interval_secs, MAX_UPDATE_INTERVAL_SECS);
        assert_eq!(options.vitals_window_hours, MIN_VITALS_WINDOW_HOURS);
        assert_eq!(options.vitals_poll_secs, MAX_VITALS_POLL_SECS);
        assert_eq!(options.port, DEFAULT_PORT);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let options = FreeSleepOptions {
            base_url: " http://10.0.0.2/ ".to_owned(),
            port: 8080,
            ..Default::default()
        }
        .clamped();
        assert_eq!(options.base_url, "http://10.0.0.2");
        assert_eq!(options.endpoint(), "http://10.0.0.2:8080");
    }

    #[test]
    fn test_nightly_time_parse() {
        let time = NightlyTime::parse("23:45").unwrap();
        assert_eq!((time.hour(), time.minute()), (23, 45));
        assert_eq!(NightlyTime::parse("7:05").unwrap().to_string(), "07:05");

        for bad in ["abc", "", "24:00", "12:60", "12:5", "1:2:3", "-1:00", "12 :30"] {
            assert!(NightlyTime::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_malformed_nightly_time_falls_back_to_two_am() {
        let options = FreeSleepOptions {
            nightly_time: "abc".to_owned(),
            ..Default::default()
        };
        assert_eq!(options.nightly_time(), NightlyTime::new(2, 0).unwrap());
        assert_eq!(options.clamped().nightly_time, "02:00");
    }

    #[test]
    fn test_modes_from_str() {
        assert_eq!("Nightly".parse::<VitalsMode>().unwrap(), VitalsMode::Nightly);
        assert_eq!("interval".parse::<RefreshMode>().unwrap(), RefreshMode::Interval);
        assert!("sometimes".parse::<VitalsMode>().is_err());
    }

    #[test]
    fn test_uses_nightly_vitals() {
        let mut options = FreeSleepOptions {
            vitals_mode: VitalsMode::Nightly,
            ..Default::default()
        };
        assert!(options.uses_nightly_vitals());
        options.fetch_vitals = false;
        assert!(!options.uses_nightly_vitals());
    }
}
