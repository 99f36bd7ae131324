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

//! Polling coordinator and entity adapters for the Free Sleep bridge.
//!
//! The [`Coordinator`] owns the merged device [`Snapshot`](freesleep_types::Snapshot)
//! and refreshes it on a timer; entity adapters under [`entities`] project that
//! snapshot into platform states and turn user actions into optimistic writes.

pub mod aliases;
pub mod context;
pub mod coordinator;
pub mod entities;
pub mod nightly;
pub mod scheduler;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod vitals;

pub use context::{IntegrationContext, entry_id_for};
pub use coordinator::{Coordinator, CoordinatorEvent};
pub use entities::{DeviceInfo, Entity, EntityCommand, EntityState, Platform, build_entities};
pub use scheduler::RefreshTimer;
pub use traits::{DeviceDataSource, WriteTarget};
