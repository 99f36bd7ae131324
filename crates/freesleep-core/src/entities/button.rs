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
use std::sync::Arc;

use super::{DeviceInfo, Entity, EntityBase, EntityCommand, EntityState, Platform, hub_payload};
use crate::aliases::fields;
use crate::coordinator::Coordinator;
use crate::traits::WriteTarget;

/// Starts a water-system prime
#[derive(Debug)]
pub struct PrimeButton {
    base: EntityBase,
}

impl PrimeButton {
    pub fn new(coordinator: &Arc<Coordinator>) -> Self {
        Self {
            base: EntityBase::new(coordinator, "prime_button", None),
        }
    }

    pub fn press(&self) {
        self.base.coordinator().apply_write(
            WriteTarget::DeviceStatus,
            hub_payload(fields::IS_PRIMING.canonical(), true),
        );
    }
}

impl Entity for PrimeButton {
    fn platform(&self) -> Platform {
        Platform::Button
    }

    fn unique_id(&self) -> &str {
        self.base.unique_id()
    }

    fn name(&self) -> String {
        "Free Sleep Prime Now".to_owned()
    }

    fn device_info(&self) -> DeviceInfo {
        self.base.device_info()
    }

    fn state(&self) -> EntityState {
        EntityState::Stateless
    }

    fn available(&self) -> bool {
        self.base.available()
    }

    fn execute(&self, command: EntityCommand) -> Result<()> {
        if command != EntityCommand::Press {
            bail!("{} does not support {command:?}", self.unique_id());
        }
        self.press();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BinaryKind, BinarySensor};
    use crate::testing::coordinator_with;
    use freesleep_types::FreeSleepOptions;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_press_marks_priming() {
        let (coordinator, source) = coordinator_with(FreeSleepOptions::default());
        coordinator.refresh().await.unwrap();
        let button = PrimeButton::new(&coordinator);
        let priming = BinarySensor::new(&coordinator, BinaryKind::Priming);
        assert_eq!(priming.state(), EntityState::Binary { is_on: false });

        button.execute(EntityCommand::Press).unwrap();
        assert_eq!(priming.state(), EntityState::Binary { is_on: true });

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            Value::Object(source.writes()[0].1.clone()),
            json!({"isPriming": true})
        );
    }

    #[tokio::test]
    async fn test_button_rejects_toggle() {
        let (coordinator, _source) = coordinator_with(FreeSleepOptions::default());
        let button = PrimeButton::new(&coordinator);
        assert!(button.execute(EntityCommand::TurnOn).is_err());
        assert_eq!(button.state(), EntityState::Stateless);
    }
}
