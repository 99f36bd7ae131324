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

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use freesleep_types::{JsonObject, Section, Side};

/// Writable device endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteTarget {
    DeviceStatus,
    Settings,
}

impl WriteTarget {
    /// Snapshot section mirrored by this endpoint
    pub fn section(self) -> Section {
        match self {
            Self::DeviceStatus => Section::DeviceStatus,
            Self::Settings => Section::Settings,
        }
    }
}

/// Source of device data for the coordinator.
///
/// The REST adapter is the production implementation; each call maps to
/// exactly one request and never retries.
#[async_trait]
pub trait DeviceDataSource: Send + Sync {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    async fn fetch_device_status(&self) -> Result<JsonObject>;

    async fn fetch_settings(&self) -> Result<JsonObject>;

    /// Vitals summary for one side over `[start, end]`
    async fn fetch_vitals_summary(
        &self,
        side: Side,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<JsonObject>;

    async fn fetch_presence(&self) -> Result<JsonObject>;

    /// Send a partial update to a writable endpoint
    async fn write(&self, target: WriteTarget, payload: JsonObject) -> Result<()>;

    /// Check whether the device answers at all
    async fn health_check(&self) -> Result<bool>;
}
