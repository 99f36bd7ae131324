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

//! `freesleep.toml` loading, env overrides and validation

pub mod validation;

use anyhow::{Context, Result};
use freesleep_types::options::{
    DEFAULT_BASE_URL, DEFAULT_NIGHTLY_TIME, DEFAULT_PORT, DEFAULT_UPDATE_INTERVAL_SECS,
    DEFAULT_VITALS_POLL_SECS, DEFAULT_VITALS_WINDOW_HOURS, DEFAULT_WRITE_REFRESH_DELAY_SECS,
};
use freesleep_types::{FreeSleepOptions, NightlyTime, RefreshMode, VitalsMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub use validation::{ValidationIssue, ValidationResult, ValidationSeverity};

pub const DEFAULT_CONFIG_PATH: &str = "freesleep.toml";

pub const ENV_BASE_URL: &str = "FREE_SLEEP_BASE_URL";
pub const ENV_PORT: &str = "FREE_SLEEP_PORT";
pub const ENV_UPDATE_INTERVAL_SECS: &str = "FREE_SLEEP_UPDATE_INTERVAL_SECS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub vitals: VitalsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
    #[serde(default)]
    pub refresh_mode: RefreshMode,
    #[serde(default = "default_write_refresh_delay_secs")]
    pub write_refresh_delay_secs: u64,
    #[serde(default = "default_true")]
    pub fetch_presence: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mode: VitalsMode,
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
    #[serde(default = "default_nightly_time")]
    pub nightly_time: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_update_interval_secs() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_write_refresh_delay_secs() -> u64 {
    DEFAULT_WRITE_REFRESH_DELAY_SECS
}

fn default_true() -> bool {
    true
}

fn default_window_hours() -> u32 {
    DEFAULT_VITALS_WINDOW_HOURS
}

fn default_poll_secs() -> u64 {
    DEFAULT_VITALS_POLL_SECS
}

fn default_nightly_time() -> String {
    DEFAULT_NIGHTLY_TIME.to_string()
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            port: default_port(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
            refresh_mode: RefreshMode::default(),
            write_refresh_delay_secs: default_write_refresh_delay_secs(),
            fetch_presence: true,
        }
    }
}

impl Default for VitalsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: VitalsMode::default(),
            window_hours: default_window_hours(),
            poll_secs: default_poll_secs(),
            nightly_time: default_nightly_time(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config TOML")
    }

    /// Read `path`, or start from defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            info!(path = %path.display(), "Loading configuration");
            Self::from_file(path)
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load and apply overrides from the process environment
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::load_or_default(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `FREE_SLEEP_*` overrides. Unparseable values are ignored.
    ///
    /// Returns the names of the variables that were applied.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<&'static str> {
        let mut applied = Vec::new();

        if let Some(base_url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.device.base_url = base_url.trim().to_owned();
            applied.push(ENV_BASE_URL);
        }

        if let Some(raw) = lookup(ENV_PORT) {
            match raw.trim().parse() {
                Ok(port) => {
                    self.device.port = port;
                    applied.push(ENV_PORT);
                }
                Err(e) => warn!(var = ENV_PORT, value = %raw, error = %e, "Ignoring invalid override"),
            }
        }

        if let Some(raw) = lookup(ENV_UPDATE_INTERVAL_SECS) {
            match raw.trim().parse() {
                Ok(secs) => {
                    self.polling.update_interval_secs = secs;
                    applied.push(ENV_UPDATE_INTERVAL_SECS);
                }
                Err(e) => warn!(
                    var = ENV_UPDATE_INTERVAL_SECS,
                    value = %raw,
                    error = %e,
                    "Ignoring invalid override"
                ),
            }
        }

        applied
    }

    /// Options as written, before clamping
    fn raw_options(&self) -> FreeSleepOptions {
        FreeSleepOptions {
            base_url: self.device.base_url.clone(),
            port: self.device.port,
            update_interval_secs: self.polling.update_interval_secs,
            refresh_mode: self.polling.refresh_mode,
            write_refresh_delay_secs: self.polling.write_refresh_delay_secs,
            fetch_presence: self.polling.fetch_presence,
            fetch_vitals: self.vitals.enabled,
            vitals_mode: self.vitals.mode,
            vitals_window_hours: self.vitals.window_hours,
            vitals_poll_secs: self.vitals.poll_secs,
            nightly_time: self.vitals.nightly_time.clone(),
        }
    }

    /// Clamped options for the coordinator
    pub fn to_options(&self) -> FreeSleepOptions {
        self.raw_options().clamped()
    }

    /// Out-of-range values are warnings (they get clamped), a missing or
    /// non-HTTP base URL is an error.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::success();

        let base_url = self.device.base_url.trim();
        if base_url.is_empty() {
            result.add_error("device.base_url", "Base URL must not be empty");
        } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            result.add_error(
                "device.base_url",
                format!("Base URL must start with http:// or https://, got '{base_url}'"),
            );
        } else if base_url
            .split_once("://")
            .is_some_and(|(_, host)| host.trim_matches('/').is_empty())
        {
            result.add_error("device.base_url", "Base URL has no host");
        }

        if NightlyTime::parse(&self.vitals.nightly_time).is_err() {
            result.add_warning(
                "vitals.nightly_time",
                format!(
                    "'{}' is not a valid HH:MM time, using {DEFAULT_NIGHTLY_TIME}",
                    self.vitals.nightly_time
                ),
            );
        }

        for adjustment in self.raw_options().normalize() {
            let field = match adjustment.field {
                "port" => "device.port",
                "update_interval_secs" => "polling.update_interval_secs",
                "write_refresh_delay_secs" => "polling.write_refresh_delay_secs",
                "vitals_window_hours" => "vitals.window_hours",
                "vitals_poll_secs" => "vitals.poll_secs",
                // Already reported above with a clearer message
                "nightly_time" | "base_url" => continue,
                other => other,
            };
            result.add_warning(
                field,
                format!("{} is out of range, using {}", adjustment.from, adjustment.to),
            );
        }

        result
    }
}

/// Write `config` to `path` via a temp file and rename
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    info!(path = %path.display(), "Configuration saved");
    Ok(())
}
