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

//! REST adapter for the Free Sleep device API

pub mod api;

pub use api::{
    API_DEVICE_STATUS, API_PRESENCE, API_SETTINGS, API_VITALS_SUMMARY, ApiError, ApiResult,
    FreeSleepClient, FreeSleepDeviceAdapter,
};
