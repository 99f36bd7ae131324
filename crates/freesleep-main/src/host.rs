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

//! Entity host: renders every entity and reports state changes

use freesleep_core::{
    Coordinator, CoordinatorEvent, DeviceInfo, Entity, EntityState, Platform, build_entities,
};
use freesleep_types::JsonObject;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Snapshot of one entity as a host would display it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEntity {
    pub unique_id: String,
    pub platform: Platform,
    pub name: String,
    pub available: bool,
    pub state: EntityState,
    pub device: DeviceInfo,
    #[serde(skip_serializing_if = "JsonObject::is_empty")]
    pub attributes: JsonObject,
}

impl RenderedEntity {
    fn from_entity(entity: &dyn Entity) -> Self {
        Self {
            unique_id: entity.unique_id().to_owned(),
            platform: entity.platform(),
            name: entity.name(),
            available: entity.available(),
            state: entity.state(),
            device: entity.device_info(),
            attributes: entity.attributes(),
        }
    }
}

#[derive(Debug)]
pub struct EntityHost {
    coordinator: Arc<Coordinator>,
    entities: Vec<Arc<dyn Entity>>,
    last_rendered: HashMap<String, RenderedEntity>,
}

impl EntityHost {
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        let entities = build_entities(&coordinator);
        info!(count = entities.len(), "Entities created");
        Self {
            coordinator,
            entities,
            last_rendered: HashMap::new(),
        }
    }

    pub fn entities(&self) -> &[Arc<dyn Entity>] {
        &self.entities
    }

    pub fn find(&self, unique_id: &str) -> Option<&Arc<dyn Entity>> {
        self.entities.iter().find(|e| e.unique_id() == unique_id)
    }

    /// Current state of every entity
    pub fn render(&self) -> Vec<RenderedEntity> {
        self.entities
            .iter()
            .map(|entity| RenderedEntity::from_entity(entity.as_ref()))
            .collect()
    }

    /// Re-render and return the entities whose output changed since the last sync
    pub fn sync(&mut self) -> Vec<RenderedEntity> {
        let mut changed = Vec::new();
        for rendered in self.render() {
            if self.last_rendered.get(&rendered.unique_id) != Some(&rendered) {
                self.last_rendered
                    .insert(rendered.unique_id.clone(), rendered.clone());
                changed.push(rendered);
            }
        }
        changed
    }

    /// Follow coordinator events until `shutdown` resolves
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut events = self.coordinator.subscribe();
        self.log_changes();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    debug!("Entity host stopping");
                    break;
                }
                event = events.recv() => match event {
                    Ok(CoordinatorEvent::Updated) => self.log_changes(),
                    Ok(CoordinatorEvent::UpdateFailed { reason }) => {
                        warn!(%reason, "Device update failed, entities unavailable");
                        self.log_changes();
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Entity host lagged behind coordinator events");
                        self.log_changes();
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }

    fn log_changes(&mut self) {
        for entity in self.sync() {
            let state = serde_json::to_string(&entity.state).unwrap_or_default();
            info!(
                entity = %entity.unique_id,
                platform = %entity.platform,
                available = entity.available,
                %state,
                "Entity state"
            );
        }
    }
}
