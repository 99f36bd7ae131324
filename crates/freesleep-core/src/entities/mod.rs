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

//! Entity adapters projecting the coordinator snapshot into platform states.
//!
//! Reads never fail: missing or malformed fields render as
//! [`EntityState::Unknown`]. Writes go through
//! [`Coordinator::apply_write`](crate::Coordinator::apply_write).

pub mod binary_sensor;
pub mod button;
pub mod climate;
pub mod sensor;
pub mod switch;

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use freesleep_types::{JsonObject, Section, Side, Snapshot};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::aliases::fields;
use crate::coordinator::Coordinator;

pub use binary_sensor::{BinaryKind, BinarySensor, PresenceSensor};
pub use button::PrimeButton;
pub use climate::{ClimateState, HvacAction, HvacMode, SideClimate};
pub use sensor::{LastPrimeSensor, SecondsRemainingSensor, VitalsMetric, VitalsSensor, WaterLevelSensor};
pub use switch::{AwayModeSwitch, LinkBothSidesSwitch, SidePowerSwitch};

pub const MANUFACTURER: &str = "free-sleep (Unofficial)";
pub const HUB_NAME: &str = "Free Sleep Hub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Climate,
    Sensor,
    BinarySensor,
    Switch,
    Button,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Climate => "climate",
            Self::Sensor => "sensor",
            Self::BinarySensor => "binary_sensor",
            Self::Switch => "switch",
            Self::Button => "button",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device an entity is grouped under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: &'static str,
    /// Parent device, set for the per-side devices
    pub via_device: Option<String>,
}

/// Rendered entity state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityState {
    Unknown,
    Binary {
        is_on: bool,
    },
    Number {
        value: f64,
        unit: Option<&'static str>,
    },
    Text {
        value: String,
    },
    Timestamp {
        value: DateTime<Utc>,
    },
    Climate(ClimateState),
    /// Buttons have no state
    Stateless,
}

impl EntityState {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Action a host can send to an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityCommand {
    TurnOn,
    TurnOff,
    SetTemperature(f64),
    SetHvacMode(HvacMode),
    Press,
}

pub trait Entity: Send + Sync + fmt::Debug {
    fn platform(&self) -> Platform;

    /// `{entry_id}_{suffix}`, stable across restarts
    fn unique_id(&self) -> &str;

    fn name(&self) -> String;

    fn device_info(&self) -> DeviceInfo;

    fn state(&self) -> EntityState;

    fn available(&self) -> bool;

    /// Extra attributes shown next to the state
    fn attributes(&self) -> JsonObject {
        JsonObject::new()
    }

    /// Handle a host command. Entities reject commands they do not support.
    fn execute(&self, command: EntityCommand) -> Result<()> {
        bail!("{} does not support {command:?}", self.unique_id())
    }
}

/// Shared plumbing for every entity: coordinator handle, id and device grouping
#[derive(Debug)]
pub(crate) struct EntityBase {
    coordinator: Arc<Coordinator>,
    unique_id: String,
    side: Option<Side>,
}

impl EntityBase {
    pub(crate) fn new(coordinator: &Arc<Coordinator>, suffix: &str, side: Option<Side>) -> Self {
        let unique_id = format!("{}_{suffix}", coordinator.context().entry_id());
        Self {
            coordinator: Arc::clone(coordinator),
            unique_id,
            side,
        }
    }

    pub(crate) fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub(crate) fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub(crate) fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    pub(crate) fn with_snapshot<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        self.coordinator.with_snapshot(f)
    }

    /// Display name of `side`, as configured on the device
    pub(crate) fn side_name(&self, side: Side) -> String {
        self.with_snapshot(|snapshot| side_name(snapshot, side))
    }

    /// Raw `device_status` plus the endpoint it was read from
    pub(crate) fn device_status_attributes(&self) -> JsonObject {
        let mut attributes = JsonObject::new();
        attributes.insert(
            "deviceStatus".to_owned(),
            self.with_snapshot(|snapshot| Value::Object(snapshot.device_status.clone())),
        );
        attributes.insert(
            "source".to_owned(),
            Value::String(self.coordinator.context().options().endpoint()),
        );
        attributes
    }

    pub(crate) fn device_info(&self) -> DeviceInfo {
        let entry_id = self.coordinator.context().entry_id();
        let hub = format!("{entry_id}_hub");
        match self.side {
            None => DeviceInfo {
                identifier: hub,
                name: HUB_NAME.to_owned(),
                manufacturer: MANUFACTURER,
                via_device: None,
            },
            Some(side) => DeviceInfo {
                identifier: format!("{entry_id}_{side}_device"),
                name: self.side_name(side),
                manufacturer: MANUFACTURER,
                via_device: Some(hub),
            },
        }
    }
}

/// `settings.{side}.name` when set, otherwise the capitalized side
pub fn side_name(snapshot: &Snapshot, side: Side) -> String {
    snapshot
        .side(Section::Settings, side)
        .and_then(|settings| fields::SIDE_NAME.resolve_str(settings))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| side.display_name().to_owned(), str::to_owned)
}

/// `{key: value}`
pub(crate) fn hub_payload(key: &str, value: impl Into<Value>) -> JsonObject {
    let mut payload = JsonObject::new();
    payload.insert(key.to_owned(), value.into());
    payload
}

/// `{side: {key: value}}`
pub(crate) fn side_payload(side: Side, key: &str, value: impl Into<Value>) -> JsonObject {
    hub_payload(side.as_str(), hub_payload(key, value))
}

/// Every entity for one configured device
pub fn build_entities(coordinator: &Arc<Coordinator>) -> Vec<Arc<dyn Entity>> {
    let mut entities: Vec<Arc<dyn Entity>> = vec![
        Arc::new(LastPrimeSensor::new(coordinator)),
        Arc::new(WaterLevelSensor::new(coordinator)),
        Arc::new(BinarySensor::new(coordinator, BinaryKind::Priming)),
        Arc::new(BinarySensor::new(coordinator, BinaryKind::HeatingActive)),
        Arc::new(BinarySensor::new(coordinator, BinaryKind::CoolingActive)),
        Arc::new(LinkBothSidesSwitch::new(coordinator)),
        Arc::new(PrimeButton::new(coordinator)),
    ];

    let options = coordinator.context().options();
    for side in Side::ALL {
        entities.push(Arc::new(SideClimate::new(coordinator, side)));
        entities.push(Arc::new(SecondsRemainingSensor::new(coordinator, side)));
        entities.push(Arc::new(BinarySensor::new(coordinator, BinaryKind::Alarm(side))));
        entities.push(Arc::new(PresenceSensor::new(coordinator, side)));
        entities.push(Arc::new(AwayModeSwitch::new(coordinator, side)));
        entities.push(Arc::new(SidePowerSwitch::new(coordinator, side)));
        if options.fetch_vitals {
            for metric in VitalsMetric::ALL {
                entities.push(Arc::new(VitalsSensor::new(coordinator, side, metric)));
            }
        }
    }

    entities
}
