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

use freesleep_types::{JsonObject, Section, Side, Snapshot};
use serde_json::Value;
use std::sync::Arc;

use super::{DeviceInfo, Entity, EntityBase, EntityState, Platform};
use crate::aliases::{FieldAliases, fields, value_as_bool};
use crate::coordinator::Coordinator;

/// Binary sensors read straight from `device_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryKind {
    Priming,
    HeatingActive,
    CoolingActive,
    Alarm(Side),
}

impl BinaryKind {
    fn suffix(self) -> String {
        match self {
            Self::Priming => "is_priming".to_owned(),
            Self::HeatingActive => "heating_active".to_owned(),
            Self::CoolingActive => "cooling_active".to_owned(),
            Self::Alarm(side) => format!("{side}_alarm"),
        }
    }

    fn side(self) -> Option<Side> {
        match self {
            Self::Alarm(side) => Some(side),
            Self::Priming | Self::HeatingActive | Self::CoolingActive => None,
        }
    }

    fn read(self, snapshot: &Snapshot) -> Option<bool> {
        let hub = |aliases: FieldAliases| aliases.resolve_bool(&snapshot.device_status);
        match self {
            Self::Priming => hub(fields::IS_PRIMING),
            Self::HeatingActive => hub(fields::HEATING_ACTIVE),
            Self::CoolingActive => hub(fields::COOLING_ACTIVE),
            Self::Alarm(side) => snapshot
                .side(Section::DeviceStatus, side)
                .and_then(|status| fields::IS_ALARM_VIBRATING.resolve_bool(status)),
        }
    }
}

#[derive(Debug)]
pub struct BinarySensor {
    base: EntityBase,
    kind: BinaryKind,
}

impl BinarySensor {
    pub fn new(coordinator: &Arc<Coordinator>, kind: BinaryKind) -> Self {
        Self {
            base: EntityBase::new(coordinator, &kind.suffix(), kind.side()),
            kind,
        }
    }
}

impl Entity for BinarySensor {
    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        match self.kind {
            BinaryKind::Priming => "Free Sleep Priming".to_owned(),
            BinaryKind::HeatingActive => "Heating Active".to_owned(),
            BinaryKind::CoolingActive => "Cooling Active".to_owned(),
            BinaryKind::Alarm(side) => format!("{} Alarm", self.base.side_name(side)),
        }
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        self.base
            .with_snapshot(|snapshot| self.kind.read(snapshot))
            .map_or(EntityState::Unknown, |is_on| EntityState::Binary { is_on })
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn attributes(&self) -> JsonObject {
        self.base.device_status_attributes()
    }
}

/// Bed occupancy for one side.
///
/// Prefers the dedicated presence endpoint and falls back to the presence
/// flags some firmware versions put in `device_status`.
#[derive(Debug)]
pub struct PresenceSensor {
    base: EntityBase,
    side: Side,
}

impl PresenceSensor {
    pub fn new(coordinator: &Arc<Coordinator>, side: Side) -> Self {
        Self {
            base: EntityBase::new(coordinator, &format!("{side}_presence"), Some(side)),
            side,
        }
    }

    fn read(&self, snapshot: &Snapshot) -> Option<bool> {
        let from_presence = snapshot
            .presence
            .as_ref()
            .and_then(|presence| presence.get(self.side.as_str()))
            .and_then(|value| match value {
                Value::Object(side) => fields::PRESENT.resolve_bool(side),
                other => value_as_bool(other),
            });

        from_presence.or_else(|| {
            let aliases = match self.side {
                Side::Left => fields::LEFT_PRESENT,
                Side::Right => fields::RIGHT_PRESENT,
            };
            aliases.resolve_bool(&snapshot.device_status)
        })
    }
}

impl Entity for PresenceSensor {
    fn platform(&self) -> Platform {
        Platform::BinarySensor
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        format!("{} In Bed", self.base.side_name(self.side))
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        self.base
            .with_snapshot(|snapshot| self.read(snapshot))
            .map_or(EntityState::Unknown, |is_on| EntityState::Binary { is_on })
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn attributes(&self) -> JsonObject {
        self.base.device_status_attributes()
    }
}
