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

use freesleep_types::FreeSleepOptions;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use crate::traits::DeviceDataSource;

/// Everything one configured device needs, handed to each component at construction
pub struct IntegrationContext {
    entry_id: String,
    options: RwLock<FreeSleepOptions>,
    source: Arc<dyn DeviceDataSource>,
}

impl IntegrationContext {
    pub fn new(
        entry_id: impl Into<String>,
        options: FreeSleepOptions,
        source: Arc<dyn DeviceDataSource>,
    ) -> Arc<Self> {
        Arc::new(Self {
            entry_id: entry_id.into(),
            options: RwLock::new(options.clamped()),
            source,
        })
    }

    /// Stable identifier used as the prefix of every entity unique id
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// Current options (cloned, so no lock is held by the caller)
    pub fn options(&self) -> FreeSleepOptions {
        self.options.read().clone()
    }

    /// Replace the options, clamping them first
    pub fn set_options(&self, options: FreeSleepOptions) {
        *self.options.write() = options.clamped();
    }

    pub fn source(&self) -> &Arc<dyn DeviceDataSource> {
        &self.source
    }
}

impl fmt::Debug for IntegrationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationContext")
            .field("entry_id", &self.entry_id)
            .field("options", &*self.options.read())
            .field("source", &self.source.name())
            .finish()
    }
}

/// Build an entry id from the device endpoint, e.g. `free_sleep_192_168_1_50_3000`
pub fn entry_id_for(options: &FreeSleepOptions) -> String {
    let endpoint = options.endpoint();
    let host = endpoint
        .split_once("://")
        .map_or(endpoint.as_str(), |(_, rest)| rest);
    let slug: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("free_sleep_{}", slug.trim_matches('_'))
}
