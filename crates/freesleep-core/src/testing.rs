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

//! In-memory [`DeviceDataSource`] for tests

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use freesleep_types::{FreeSleepOptions, JsonObject, Side};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::watch;

use crate::context::IntegrationContext;
use crate::coordinator::Coordinator;
use crate::traits::{DeviceDataSource, WriteTarget};

/// Entry id used by [`coordinator_with`]
pub const TEST_ENTRY_ID: &str = "free_sleep_test";

/// Coordinator backed by a fresh [`FakeDataSource`]
pub fn coordinator_with(options: FreeSleepOptions) -> (Arc<Coordinator>, Arc<FakeDataSource>) {
    let source = Arc::new(FakeDataSource::new());
    let context = IntegrationContext::new(
        TEST_ENTRY_ID,
        options,
        Arc::clone(&source) as Arc<dyn DeviceDataSource>,
    );
    (Coordinator::new(context), source)
}

#[derive(Debug, Default)]
struct FakeState {
    device_status: JsonObject,
    settings: JsonObject,
    presence: JsonObject,
    left_vitals: JsonObject,
    right_vitals: JsonObject,

    fail_device_status: bool,
    fail_settings: bool,
    fail_vitals: bool,
    fail_writes: bool,

    device_status_fetches: usize,
    settings_fetches: usize,
    vitals_fetches: usize,
    presence_fetches: usize,
    last_vitals_query: Option<(Side, DateTime<Utc>, DateTime<Utc>)>,
    writes: Vec<(WriteTarget, JsonObject)>,
}

/// Scriptable device that records every call made against it
#[derive(Debug)]
pub struct FakeDataSource {
    state: Mutex<FakeState>,
    write_gate: watch::Sender<bool>,
}

fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

impl FakeDataSource {
    /// A device with both sides populated
    pub fn new() -> Self {
        let state = FakeState {
            device_status: object(json!({
                "left": {
                    "currentTemperatureF": 78,
                    "targetTemperatureF": 80,
                    "secondsRemaining": 3600,
                    "isOn": true,
                    "isAlarmVibrating": false
                },
                "right": {
                    "currentTemperatureF": 75,
                    "targetTemperatureF": 72,
                    "secondsRemaining": 0,
                    "isOn": false,
                    "isAlarmVibrating": true
                },
                "waterLevel": "true",
                "isPriming": false
            })),
            settings: object(json!({
                "left": {"name": "Alex", "awayMode": false},
                "right": {"awayMode": true},
                "linkBothSides": false,
                "lastPrime": "2025-10-01T03:00:00.000Z"
            })),
            presence: object(json!({
                "left": {"present": true},
                "right": {"present": false}
            })),
            left_vitals: object(json!({
                "avgHeartRate": 58,
                "avgHRV": 45,
                "avgBreathingRate": 14
            })),
            right_vitals: object(json!({
                "avgHeartRate": 62,
                "avgHRV": 38,
                "avgBreathingRate": 15
            })),
            ..Default::default()
        };
        let (write_gate, _) = watch::channel(true);
        Self {
            state: Mutex::new(state),
            write_gate,
        }
    }

    pub fn set_device_status(&self, value: Value) {
        self.state.lock().device_status = object(value);
    }

    pub fn set_settings(&self, value: Value) {
        self.state.lock().settings = object(value);
    }

    pub fn set_presence(&self, value: Value) {
        self.state.lock().presence = object(value);
    }

    pub fn set_vitals(&self, side: Side, value: Value) {
        let mut state = self.state.lock();
        match side {
            Side::Left => state.left_vitals = object(value),
            Side::Right => state.right_vitals = object(value),
        }
    }

    pub fn fail_device_status(&self, fail: bool) {
        self.state.lock().fail_device_status = fail;
    }

    pub fn fail_settings(&self, fail: bool) {
        self.state.lock().fail_settings = fail;
    }

    pub fn fail_vitals(&self, fail: bool) {
        self.state.lock().fail_vitals = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make writes wait until [`FakeDataSource::release_writes`] is called
    pub fn hold_writes(&self) {
        self.write_gate.send_replace(false);
    }

    pub fn release_writes(&self) {
        self.write_gate.send_replace(true);
    }

    pub fn device_status_fetches(&self) -> usize {
        self.state.lock().device_status_fetches
    }

    pub fn settings_fetches(&self) -> usize {
        self.state.lock().settings_fetches
    }

    /// Number of per-side vitals requests
    pub fn vitals_fetches(&self) -> usize {
        self.state.lock().vitals_fetches
    }

    pub fn presence_fetches(&self) -> usize {
        self.state.lock().presence_fetches
    }

    pub fn last_vitals_query(&self) -> Option<(Side, DateTime<Utc>, DateTime<Utc>)> {
        self.state.lock().last_vitals_query
    }

    /// Writes that reached the device, in order
    pub fn writes(&self) -> Vec<(WriteTarget, JsonObject)> {
        self.state.lock().writes.clone()
    }
}

impl Default for FakeDataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceDataSource for FakeDataSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_device_status(&self) -> Result<JsonObject> {
        let mut state = self.state.lock();
        state.device_status_fetches += 1;
        if state.fail_device_status {
            bail!("device status unavailable");
        }
        Ok(state.device_status.clone())
    }

    async fn fetch_settings(&self) -> Result<JsonObject> {
        let mut state = self.state.lock();
        state.settings_fetches += 1;
        if state.fail_settings {
            bail!("settings unavailable");
        }
        Ok(state.settings.clone())
    }

    async fn fetch_vitals_summary(
        &self,
        side: Side,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<JsonObject> {
        let mut state = self.state.lock();
        state.vitals_fetches += 1;
        state.last_vitals_query = Some((side, start, end));
        if state.fail_vitals {
            bail!("vitals unavailable");
        }
        Ok(match side {
            Side::Left => state.left_vitals.clone(),
            Side::Right => state.right_vitals.clone(),
        })
    }

    async fn fetch_presence(&self) -> Result<JsonObject> {
        let mut state = self.state.lock();
        state.presence_fetches += 1;
        Ok(state.presence.clone())
    }

    async fn write(&self, target: WriteTarget, payload: JsonObject) -> Result<()> {
        let mut gate = self.write_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let mut state = self.state.lock();
        if state.fail_writes {
            bail!("write rejected");
        }
        state.writes.push((target, payload));
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.state.lock().fail_device_status)
    }
}
