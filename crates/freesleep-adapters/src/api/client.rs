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
use reqwest::{Client, Response, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::{ApiError, ApiResult};

pub const API_DEVICE_STATUS: &str = "/api/deviceStatus";
pub const API_SETTINGS: &str = "/api/settings";
pub const API_VITALS_SUMMARY: &str = "/api/metrics/vitals/summary";
pub const API_PRESENCE: &str = "/api/metrics/presence";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Free Sleep REST API client.
///
/// One request per call, no retries: a failure goes straight back to the
/// caller, which decides whether to try again on the next poll.
#[derive(Debug, Clone)]
pub struct FreeSleepClient {
    base_url: String,
    client: Client,
}

impl FreeSleepClient {
    /// Client for `{base_url}:{port}`
    pub fn new(base_url: &str, port: u16) -> ApiResult<Self> {
        Self::from_endpoint(format!(
            "{}:{port}",
            base_url.trim().trim_end_matches('/')
        ))
    }

    /// Client for a complete endpoint such as `http://192.168.1.50:3000`
    pub fn from_endpoint(endpoint: impl Into<String>) -> ApiResult<Self> {
        let endpoint = endpoint.into();
        let base_url = endpoint.trim().trim_end_matches('/').to_owned();
        Url::parse(&base_url)
            .map_err(|e| ApiError::ConfigError(format!("Invalid device URL '{base_url}': {e}")))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { base_url, client })
    }

    pub fn from_options(options: &FreeSleepOptions) -> ApiResult<Self> {
        Self::from_endpoint(options.endpoint())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and parse the body as JSON
    pub async fn get(&self, path: &str, params: &[(&str, String)]) -> ApiResult<Value> {
        let url = self.url_for(path);
        debug!(%url, ?params, "GET");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;
        let body = check_status(response)
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("GET {path} returned non-JSON body: {e}")))
    }

    /// POST `payload` to `path`.
    ///
    /// Returns the parsed body, or `None` when the device answers with an
    /// empty or non-JSON body.
    pub async fn post(&self, path: &str, payload: &Value) -> ApiResult<Option<Value>> {
        let url = self.url_for(path);
        debug!(%url, %payload, "POST");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(transport_error)?;
        let body = check_status(response)
            .await?
            .text()
            .await
            .map_err(transport_error)?;

        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(serde_json::from_str(&body).ok())
    }

    /// Health check against the device status endpoint
    pub async fn ping(&self) -> ApiResult<bool> {
        let url = self.url_for(API_DEVICE_STATUS);
        debug!("Performing health check");

        match self.client.get(&url).send().await {
            Ok(response) => {
                let is_ok = response.status().is_success();
                if is_ok {
                    debug!("Health check passed");
                } else {
                    warn!(status = %response.status(), "Health check failed");
                }
                Ok(is_ok)
            }
            Err(e) => {
                warn!(error = %e, "Health check failed, device unreachable");
                Ok(false)
            }
        }
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::HttpError(e)
    }
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}
