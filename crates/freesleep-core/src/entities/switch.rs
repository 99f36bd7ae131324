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
use std::sync::Arc;

use super::{
    DeviceInfo, Entity, EntityBase, EntityCommand, EntityState, Platform, hub_payload,
    side_payload,
};
use crate::aliases::fields;
use crate::coordinator::Coordinator;
use crate::traits::WriteTarget;

fn binary(value: Option<bool>) -> EntityState {
    value.map_or(EntityState::Unknown, |is_on| EntityState::Binary { is_on })
}

/// Shared on/off dispatch for every switch
fn toggle(entity: &dyn Entity, command: EntityCommand, set: impl FnOnce(bool)) -> Result<()> {
    match command {
        EntityCommand::TurnOn => set(true),
        EntityCommand::TurnOff => set(false),
        EntityCommand::SetTemperature(_) | EntityCommand::SetHvacMode(_) | EntityCommand::Press => {
            bail!("{} does not support {command:?}", entity.unique_id())
        }
    }
    Ok(())
}

/// Mirror temperature changes on both sides
#[derive(Debug)]
pub struct LinkBothSidesSwitch {
    base: EntityBase,
}

impl LinkBothSidesSwitch {
    pub fn new(coordinator: &Arc<Coordinator>) -> Self {
        Self {
            base: EntityBase::new(coordinator, "link_both_sides", None),
        }
    }

    pub fn set(&self, on: bool) {
        self.base.coordinator().apply_write(
            WriteTarget::Settings,
            hub_payload(fields::LINK_BOTH_SIDES.canonical(), on),
        );
    }
}

impl Entity for LinkBothSidesSwitch {
    fn platform(&self) -> Platform {
        Platform::Switch
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        "Link Both Sides".to_owned()
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        binary(
            self.base
                .with_snapshot(|snapshot| fields::LINK_BOTH_SIDES.resolve_bool(&snapshot.settings)),
        )
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn execute(&self, command: EntityCommand) -> Result<()> {
        toggle(self, command, |on| self.set(on))
    }
}

#[derive(Debug)]
pub struct AwayModeSwitch {
    base: EntityBase,
    side: Side,
}

impl AwayModeSwitch {
    pub fn new(coordinator: &Arc<Coordinator>, side: Side) -> Self {
        Self {
            base: EntityBase::new(coordinator, &format!("{side}_away_mode"), Some(side)),
            side,
        }
    }

    pub fn set(&self, on: bool) {
        self.base.coordinator().apply_write(
            WriteTarget::Settings,
            side_payload(self.side, fields::AWAY_MODE.canonical(), on),
        );
    }
}

impl Entity for AwayModeSwitch {
    fn platform(&self) -> Platform {
        Platform::Switch
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        format!("{} Away Mode", self.base.side_name(self.side))
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        binary(self.base.with_snapshot(|snapshot| {
            snapshot
                .side(Section::Settings, self.side)
                .and_then(|settings| fields::AWAY_MODE.resolve_bool(settings))
        }))
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn execute(&self, command: EntityCommand) -> Result<()> {
        toggle(self, command, |on| self.set(on))
    }
}

/// Power for one side, independent of the thermostat entity
#[derive(Debug)]
pub struct SidePowerSwitch {
    base: EntityBase,
    side: Side,
}

impl SidePowerSwitch {
    pub fn new(coordinator: &Arc<Coordinator>, side: Side) -> Self {
        Self {
            base: EntityBase::new(coordinator, &format!("{side}_power"), Some(side)),
            side,
        }
    }

    pub fn set(&self, on: bool) {
        self.base.coordinator().apply_write(
            WriteTarget::DeviceStatus,
            side_payload(self.side, fields::IS_ON.canonical(), on),
        );
    }
}

impl Entity for SidePowerSwitch {
    fn platform(&self) -> Platform {
        Platform::Switch
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        format!("{} Power", self.base.side_name(self.side))
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        binary(self.base.with_snapshot(|snapshot| {
            snapshot
                .side(Section::DeviceStatus, self.side)
                .and_then(|status| fields::IS_ON.resolve_bool(status))
        }))
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn execute(&self, command: EntityCommand) -> Result<()> {
        toggle(self, command, |on| self.set(on))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::coordinator_with;
    use freesleep_types::FreeSleepOptions;
    use serde_json::{Value, json};

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_link_both_sides_round_trip() {
        let (coordinator, source) = coordinator_with(FreeSleepOptions::default());
        coordinator.refresh().await.unwrap();
        let switch = LinkBothSidesSwitch::new(&coordinator);
        assert_eq!(switch.state(), EntityState::Binary { is_on: false });

        switch.execute(EntityCommand::TurnOn).unwrap();
        assert_eq!(switch.state(), EntityState::Binary { is_on: true });

        settle().await;
        let writes = source.writes();
        assert_eq!(writes[0].0, WriteTarget::Settings);
        assert_eq!(Value::Object(writes[0].1.clone()), json!({"linkBothSides": true}));
    }

    #[tokio::test]
    async fn test_away_mode_keeps_sibling_settings() {
        let (coordinator, source) = coordinator_with(FreeSleepOptions::default());
        coordinator.refresh().await.unwrap();
        let switch = AwayModeSwitch::new(&coordinator, Side::Left);

        switch.set(true);
        assert_eq!(switch.state(), EntityState::Binary { is_on: true });
        // Merge keeps the configured side name
        assert_eq!(switch.name(), "Alex Away Mode");

        settle().await;
        assert_eq!(
            Value::Object(source.writes()[0].1.clone()),
            json!({"left": {"awayMode": true}})
        );
    }

    #[tokio::test]
    async fn test_away_mode_without_settings_creates_side() {
        let (coordinator, source) = coordinator_with(FreeSleepOptions::default());
        source.set_settings(json!({}));
        coordinator.refresh().await.unwrap();
        let switch = AwayModeSwitch::new(&coordinator, Side::Right);
        assert!(switch.state().is_unknown());

        switch.execute(EntityCommand::TurnOn).unwrap();
        assert_eq!(switch.state(), EntityState::Binary { is_on: true });
    }

    #[tokio::test]
    async fn test_power_switch() {
        let (coordinator, source) = coordinator_with(FreeSleepOptions::default());
        coordinator.refresh().await.unwrap();
        let switch = SidePowerSwitch::new(&coordinator, Side::Left);
        assert_eq!(switch.state(), EntityState::Binary { is_on: true });

        switch.execute(EntityCommand::TurnOff).unwrap();
        assert_eq!(switch.state(), EntityState::Binary { is_on: false });
        assert!(switch.execute(EntityCommand::Press).is_err());

        settle().await;
        let writes = source.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].0, WriteTarget::DeviceStatus);
        assert_eq!(
            Value::Object(writes[0].1.clone()),
            json!({"left": {"isOn": false}})
        );
    }
}
