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

//! Field names as spelled by different device firmware versions.
//!
//! Each value the entities read has one canonical key (the one used for
//! writes) followed by the older spellings, tried in order.

use freesleep_types::JsonObject;
use serde_json::Value;

/// Ordered list of keys under which a value may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAliases {
    canonical: &'static str,
    fallbacks: &'static [&'static str],
}

impl FieldAliases {
    pub const fn new(canonical: &'static str, fallbacks: &'static [&'static str]) -> Self {
        Self {
            canonical,
            fallbacks,
        }
    }

    /// Key written back to the device
    pub fn canonical(&self) -> &'static str {
        self.canonical
    }

    pub fn candidates(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.canonical).chain(self.fallbacks.iter().copied())
    }

    /// First non-null value found under any of the candidate keys
    pub fn resolve<'a>(&self, object: &'a JsonObject) -> Option<&'a Value> {
        self.candidates()
            .filter_map(|key| object.get(key))
            .find(|value| !value.is_null())
    }

    pub fn resolve_f64(&self, object: &JsonObject) -> Option<f64> {
        self.resolve(object).and_then(value_as_f64)
    }

    pub fn resolve_bool(&self, object: &JsonObject) -> Option<bool> {
        self.resolve(object).and_then(value_as_bool)
    }

    pub fn resolve_str<'a>(&self, object: &'a JsonObject) -> Option<&'a str> {
        self.resolve(object).and_then(Value::as_str)
    }
}

/// Numbers and numeric strings
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Booleans, numbers (non-zero is true) and the usual textual spellings
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Some(true),
            "false" | "off" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub mod fields {
    use super::FieldAliases;

    // device_status, per side
    pub const CURRENT_TEMPERATURE: FieldAliases = FieldAliases::new(
        "currentTemperatureF",
        &["currentTemperature", "current_temperature_f"],
    );
    pub const TARGET_TEMPERATURE: FieldAliases = FieldAliases::new(
        "targetTemperatureF",
        &["targetTemperature", "target_temperature_f"],
    );
    pub const IS_ON: FieldAliases = FieldAliases::new("isOn", &["is_on", "on"]);
    pub const SECONDS_REMAINING: FieldAliases =
        FieldAliases::new("secondsRemaining", &["seconds_remaining"]);
    pub const IS_ALARM_VIBRATING: FieldAliases =
        FieldAliases::new("isAlarmVibrating", &["alarmVibrating", "is_alarm_vibrating"]);

    // device_status, hub level
    pub const WATER_LEVEL: FieldAliases = FieldAliases::new("waterLevel", &["water_level"]);
    pub const IS_PRIMING: FieldAliases = FieldAliases::new("isPriming", &["is_priming", "priming"]);
    pub const LEFT_PRESENT: FieldAliases =
        FieldAliases::new("leftPresent", &["left_present", "presence_left"]);
    pub const RIGHT_PRESENT: FieldAliases =
        FieldAliases::new("rightPresent", &["right_present", "presence_right"]);
    pub const HEATING_ACTIVE: FieldAliases =
        FieldAliases::new("heating_active", &["isHeating", "heating"]);
    pub const COOLING_ACTIVE: FieldAliases =
        FieldAliases::new("cooling_active", &["isCooling", "cooling"]);

    // settings
    pub const LINK_BOTH_SIDES: FieldAliases =
        FieldAliases::new("linkBothSides", &["link_both_sides"]);
    pub const LAST_PRIME: FieldAliases = FieldAliases::new("lastPrime", &["last_prime"]);
    pub const AWAY_MODE: FieldAliases = FieldAliases::new("awayMode", &["away_mode"]);
    pub const SIDE_NAME: FieldAliases = FieldAliases::new("name", &[]);

    // presence, per side
    pub const PRESENT: FieldAliases = FieldAliases::new("present", &["isPresent", "inBed"]);

    // vitals summary
    pub const HEART_RATE: FieldAliases = FieldAliases::new(
        "avgHeartRate",
        &["heartRate", "avg_heart_rate", "heart_rate"],
    );
    pub const HRV: FieldAliases = FieldAliases::new("avgHRV", &["hrv", "avg_hrv"]);
    pub const BREATHING_RATE: FieldAliases = FieldAliases::new(
        "avgBreathingRate",
        &["breathingRate", "avg_breathing_rate", "breathing_rate"],
    );
}

#[cfg(test)]
mod tests {
    use super::fields::*;
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_canonical_key_wins() {
        let status = obj(json!({"currentTemperature": 70, "currentTemperatureF": 81}));
        assert_eq!(CURRENT_TEMPERATURE.resolve_f64(&status), Some(81.0));
    }

    #[test]
    fn test_fallback_spelling_and_null_skipping() {
        let status = obj(json!({"currentTemperatureF": null, "current_temperature_f": "79.5"}));
        assert_eq!(CURRENT_TEMPERATURE.resolve_f64(&status), Some(79.5));
        assert_eq!(TARGET_TEMPERATURE.resolve_f64(&status), None);
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(value_as_bool(&json!("true")), Some(true));
        assert_eq!(value_as_bool(&json!("Off")), Some(false));
        assert_eq!(value_as_bool(&json!(0)), Some(false));
        assert_eq!(value_as_bool(&json!(2)), Some(true));
        assert_eq!(value_as_bool(&json!("maybe")), None);
        assert_eq!(value_as_bool(&json!([true])), None);
    }

    #[test]
    fn test_candidates_order() {
        let keys: Vec<_> = IS_PRIMING.candidates().collect();
        assert_eq!(keys, vec!["isPriming", "is_priming", "priming"]);
        assert_eq!(IS_PRIMING.canonical(), "isPriming");
    }
}
