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

use thiserror::Error;

/// Free Sleep API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Device returned error status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// Connectivity problems as opposed to the device answering with an error
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::Timeout)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
