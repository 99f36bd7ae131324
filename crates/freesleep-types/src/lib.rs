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

//! Shared data types for the Free Sleep bridge.
//!
//! Everything here is plain data: the merged device snapshot, the vitals cache
//! and the user-facing options with their clamping rules.

pub mod error;
pub mod options;
pub mod side;
pub mod snapshot;
pub mod vitals;

// Re-export common types for convenience
pub use error::{TypesError, TypesResult};
pub use options::{FreeSleepOptions, NightlyTime, OptionAdjustment, RefreshMode, VitalsMode};
pub use side::Side;
pub use snapshot::{JsonObject, Section, Snapshot, deep_merge, object_or_empty};
pub use vitals::VitalsCache;
