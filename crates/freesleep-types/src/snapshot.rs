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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::side::Side;
use crate::vitals::VitalsCache;

/// A JSON object as returned by the device API
pub type JsonObject = Map<String, Value>;

/// Top-level sections of the snapshot that mirror a device endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    DeviceStatus,
    Settings,
    Presence,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Self::DeviceStatus => "device_status",
            Self::Settings => "settings",
            Self::Presence => "presence",
        }
    }
}

/// Merged view of every polled endpoint.
///
/// Per-side fields live under `left`/`right` inside a section, hub-level
/// fields sit directly in the section object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub device_status: JsonObject,
    #[serde(default)]
    pub settings: JsonObject,
    #[serde(default)]
    pub presence: Option<JsonObject>,
    #[serde(default)]
    pub vitals: Option<VitalsCache>,
}

impl Snapshot {
    pub fn section(&self, section: Section) -> Option<&JsonObject> {
        match section {
            Section::DeviceStatus => Some(&self.device_status),
            Section::Settings => Some(&self.settings),
            Section::Presence => self.presence.as_ref(),
        }
    }

    /// Mutable access to a section, creating an empty presence section on demand
    pub fn section_mut(&mut self, section: Section) -> &mut JsonObject {
        match section {
            Section::DeviceStatus => &mut self.device_status,
            Section::Settings => &mut self.settings,
            Section::Presence => self.presence.get_or_insert_with(JsonObject::new),
        }
    }

    /// The nested object for one side of a section, if present and well-formed
    pub fn side(&self, section: Section, side: Side) -> Option<&JsonObject> {
        self.section(section)?
            .get(side.as_str())
            .and_then(Value::as_object)
    }

    /// Deep-merge a write payload into a section.
    ///
    /// Nested objects are merged key by key, every other value replaces
    /// whatever was stored under the same key.
    pub fn patch(&mut self, section: Section, payload: &JsonObject) {
        deep_merge(self.section_mut(section), payload);
    }
}

/// Recursively merge `patch` into `target`
pub fn deep_merge(target: &mut JsonObject, patch: &JsonObject) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Accept any JSON value as a section, treating non-objects as empty
pub fn object_or_empty(value: Value, what: &str) -> JsonObject {
    match value {
        Value::Object(map) => map,
        Value::Null => JsonObject::new(),
        other => {
            warn!(
                section = what,
                kind = json_kind(&other),
                "Expected a JSON object, treating section as empty"
            );
            JsonObject::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_patch_replaces_only_addressed_field() {
        let mut snapshot = Snapshot {
            device_status: obj(json!({
                "left": {"targetTemperatureF": 80, "isOn": true},
                "waterLevel": "true"
            })),
            ..Default::default()
        };

        snapshot.patch(
            Section::DeviceStatus,
            &obj(json!({"left": {"targetTemperatureF": 72.0}})),
        );

        let left = snapshot.side(Section::DeviceStatus, Side::Left).unwrap();
        assert_eq!(left["targetTemperatureF"], json!(72.0));
        assert_eq!(left["isOn"], json!(true));
        assert_eq!(snapshot.device_status["waterLevel"], json!("true"));
    }

    #[test]
    fn test_patch_creates_missing_sections() {
        let mut snapshot = Snapshot::default();
        snapshot.patch(Section::Settings, &obj(json!({"right": {"awayMode": true}})));
        snapshot.patch(Section::Presence, &obj(json!({"left": {"present": false}})));

        assert_eq!(
            snapshot.side(Section::Settings, Side::Right).unwrap()["awayMode"],
            json!(true)
        );
        assert!(snapshot.presence.is_some());
    }

    #[test]
    fn test_object_replaces_scalar() {
        let mut target = obj(json!({"left": 5}));
        deep_merge(&mut target, &obj(json!({"left": {"isOn": false}})));
        assert_eq!(target["left"], json!({"isOn": false}));
    }

    #[test]
    fn test_object_or_empty() {
        assert_eq!(object_or_empty(json!({"a": 1}), "test").len(), 1);
        assert!(object_or_empty(json!([1, 2]), "test").is_empty());
        assert!(object_or_empty(Value::Null, "test").is_empty());
    }

    #[test]
    fn test_side_ignores_malformed_nested_value() {
        let snapshot = Snapshot {
            device_status: obj(json!({"left": "broken"})),
            ..Default::default()
        };
        assert!(snapshot.side(Section::DeviceStatus, Side::Left).is_none());
        assert!(snapshot.side(Section::Presence, Side::Left).is_none());
    }
}
