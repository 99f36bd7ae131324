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

pub mod adapter;
pub mod client;
pub mod errors;

pub use adapter::FreeSleepDeviceAdapter;
pub use client::{
    API_DEVICE_STATUS, API_PRESENCE, API_SETTINGS, API_VITALS_SUMMARY, FreeSleepClient,
};
pub use errors::{ApiError, ApiResult};
