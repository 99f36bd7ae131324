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

use anyhow::{Result, bail};
use freesleep_types::{Section, Side};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::{DeviceInfo, Entity, EntityBase, EntityCommand, EntityState, Platform, side_payload};
use crate::aliases::fields;
use crate::coordinator::Coordinator;
use crate::traits::WriteTarget;

pub const MIN_TEMPERATURE_F: f64 = 55.0;
pub const MAX_TEMPERATURE_F: f64 = 115.0;
pub const TEMPERATURE_STEP_F: f64 = 1.0;
pub const TEMPERATURE_UNIT: &str = "°F";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacMode {
    HeatCool,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HvacAction {
    Heating,
    Cooling,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateState {
    pub current_temperature: Option<f64>,
    pub target_temperature: Option<f64>,
    pub hvac_mode: HvacMode,
    pub hvac_action: HvacAction,
    pub min_temp: f64,
    pub max_temp: f64,
    pub unit: &'static str,
}

/// Clamp a requested temperature to the device range and snap it to whole degrees
pub fn clamp_temperature(value: f64) -> Result<f64> {
    if !value.is_finite() {
        bail!("Invalid target temperature: {value}");
    }
    let clamped = value.clamp(MIN_TEMPERATURE_F, MAX_TEMPERATURE_F);
    Ok((clamped / TEMPERATURE_STEP_F).round() * TEMPERATURE_STEP_F)
}

fn hvac_action(is_on: bool, current: Option<f64>, target: Option<f64>) -> HvacAction {
    match (is_on, current, target) {
        (true, Some(current), Some(target)) if current < target => HvacAction::Heating,
        (true, Some(current), Some(target)) if current > target => HvacAction::Cooling,
        _ => HvacAction::Idle,
    }
}

/// Thermostat for one side of the bed
#[derive(Debug)]
pub struct SideClimate {
    base: EntityBase,
    side: Side,
}

impl SideClimate {
    pub fn new(coordinator: &Arc<Coordinator>, side: Side) -> Self {
        Self {
            base: EntityBase::new(coordinator, &format!("{side}_climate"), Some(side)),
            side,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// Set the target temperature. Returns the value actually sent.
    pub fn set_temperature(&self, value: f64) -> Result<f64> {
        let target = clamp_temperature(value)?;
        if (target - value).abs() > f64::EPSILON {
            info!(side = %self.side, requested = value, target, "Target temperature adjusted to device range");
        }
        self.base.coordinator().apply_write(
            WriteTarget::DeviceStatus,
            side_payload(self.side, fields::TARGET_TEMPERATURE.canonical(), target),
        );
        Ok(target)
    }

    pub fn set_hvac_mode(&self, mode: HvacMode) {
        self.base.coordinator().apply_write(
            WriteTarget::DeviceStatus,
            side_payload(self.side, fields::IS_ON.canonical(), mode == HvacMode::HeatCool),
        );
    }
}

impl Entity for SideClimate {
    fn platform(&self) -> Platform {
        Platform::Climate
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        format!("{} Climate", self.base.side_name(self.side))
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        self.base.with_snapshot(|snapshot| {
            let Some(status) = snapshot.side(Section::DeviceStatus, self.side) else {
                return EntityState::Unknown;
            };
            let current = fields::CURRENT_TEMPERATURE.resolve_f64(status);
            let target = fields::TARGET_TEMPERATURE.resolve_f64(status);
            let is_on = fields::IS_ON.resolve_bool(status).unwrap_or(false);

            EntityState::Climate(ClimateState {
                current_temperature: current,
                target_temperature: target,
                hvac_mode: if is_on { HvacMode::HeatCool } else { HvacMode::Off },
                hvac_action: hvac_action(is_on, current, target),
                min_temp: MIN_TEMPERATURE_F,
                max_temp: MAX_TEMPERATURE_F,
                unit: TEMPERATURE_UNIT,
            })
        })
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn execute(&self, command: EntityCommand) -> Result<()> {
        match command {
            EntityCommand::SetTemperature(value) => self.set_temperature(value).map(|_| ()),
            EntityCommand::SetHvacMode(mode) => {
                self.set_hvac_mode(mode);
                Ok(())
            }
            EntityCommand::TurnOn => {
                self.set_hvac_mode(HvacMode::HeatCool);
                Ok(())
            }
            EntityCommand::TurnOff => {
                self.set_hvac_mode(HvacMode::Off);
                Ok(())
            }
            EntityCommand::Press => bail!("{} does not support {command:?}", self.unique_id()),
        }
    }
}
