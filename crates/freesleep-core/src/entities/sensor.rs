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

use chrono::{DateTime, NaiveDateTime, Utc};
use freesleep_types::{Section, Side};
use serde_json::Value;
use std::sync::Arc;

use super::{DeviceInfo, Entity, EntityBase, EntityState, Platform};
use crate::aliases::{FieldAliases, fields};
use crate::coordinator::Coordinator;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a device timestamp; values without an offset are taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

fn number(value: Option<f64>, unit: Option<&'static str>) -> EntityState {
    value.map_or(EntityState::Unknown, |value| EntityState::Number { value, unit })
}

/// When the water system was last primed
#[derive(Debug)]
pub struct LastPrimeSensor {
    base: EntityBase,
}

impl LastPrimeSensor {
    pub fn new(coordinator: &Arc<Coordinator>) -> Self {
        Self {
            base: EntityBase::new(coordinator, "last_prime", None),
        }
    }
}

impl Entity for LastPrimeSensor {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        "Free Sleep Last Prime".to_owned()
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        self.base.with_snapshot(|snapshot| {
            fields::LAST_PRIME
                .resolve_str(&snapshot.settings)
                .and_then(parse_timestamp)
                .map_or(EntityState::Unknown, |value| EntityState::Timestamp { value })
        })
    }

    fn available(&self) -> bool {
        self.base.available()
    }
}

#[derive(Debug)]
pub struct WaterLevelSensor {
    base: EntityBase,
}

impl WaterLevelSensor {
    pub fn new(coordinator: &Arc<Coordinator>) -> Self {
        Self {
            base: EntityBase::new(coordinator, "water_level", None),
        }
    }
}

impl Entity for WaterLevelSensor {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        "Free Sleep Water Level".to_owned()
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    // Firmware reports either a number or a "true"/"false" string
    fn state(&self) -> EntityState {
        self.base.with_snapshot(|snapshot| {
            match fields::WATER_LEVEL.resolve(&snapshot.device_status) {
                Some(Value::Number(n)) => number(n.as_f64(), None),
                Some(Value::String(s)) => EntityState::Text { value: s.clone() },
                Some(Value::Bool(b)) => EntityState::Text {
                    value: b.to_string(),
                },
                Some(Value::Null | Value::Array(_) | Value::Object(_)) | None => {
                    EntityState::Unknown
                }
            }
        })
    }

    fn available(&self) -> bool {
        self.base.available()
    }
}

#[derive(Debug)]
pub struct SecondsRemainingSensor {
    base: EntityBase,
    side: Side,
}

impl SecondsRemainingSensor {
    pub fn new(coordinator: &Arc<Coordinator>, side: Side) -> Self {
        Self {
            base: EntityBase::new(coordinator, &format!("{side}_seconds_remaining"), Some(side)),
            side,
        }
    }
}

impl Entity for SecondsRemainingSensor {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        format!("{} Seconds Remaining", self.base.side_name(self.side))
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        self.base.with_snapshot(|snapshot| {
            let value = snapshot
                .side(Section::DeviceStatus, self.side)
                .and_then(|status| fields::SECONDS_REMAINING.resolve_f64(status));
            number(value, Some("s"))
        })
    }

    fn available(&self) -> bool {
        self.base.available()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalsMetric {
    HeartRate,
    Hrv,
    BreathingRate,
}

impl VitalsMetric {
    pub const ALL: [VitalsMetric; 3] = [Self::HeartRate, Self::Hrv, Self::BreathingRate];

    pub fn key(self) -> &'static str {
        match self {
            Self::HeartRate => "heart_rate",
            Self::Hrv => "hrv",
            Self::BreathingRate => "breathing_rate",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HeartRate => "Heart Rate",
            Self::Hrv => "HRV",
            Self::BreathingRate => "Breathing Rate",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::HeartRate => "bpm",
            Self::Hrv => "ms",
            Self::BreathingRate => "br/min",
        }
    }

    fn aliases(self) -> FieldAliases {
        match self {
            Self::HeartRate => fields::HEART_RATE,
            Self::Hrv => fields::HRV,
            Self::BreathingRate => fields::BREATHING_RATE,
        }
    }
}

/// Averaged vitals over the configured window
#[derive(Debug)]
pub struct VitalsSensor {
    base: EntityBase,
    side: Side,
    metric: VitalsMetric,
}

impl VitalsSensor {
    pub fn new(coordinator: &Arc<Coordinator>, side: Side, metric: VitalsMetric) -> Self {
        Self {
            base: EntityBase::new(coordinator, &format!("{side}_{}", metric.key()), Some(side)),
            side,
            metric,
        }
    }
}

impl Entity for VitalsSensor {
    fn platform(&self) -> Platform {
        Platform::Sensor
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        format!("{} {}", self.base.side_name(self.side), self.metric.label())
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        self.base.with_snapshot(|snapshot| {
            let value = snapshot
                .vitals
                .as_ref()
                .and_then(|vitals| self.metric.aliases().resolve_f64(vitals.side(self.side)));
            number(value, Some(self.metric.unit()))
        })
    }

    fn available(&self) -> bool {
        self.base.available()
    }
}
