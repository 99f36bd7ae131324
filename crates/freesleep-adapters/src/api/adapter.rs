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

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use freesleep_core::{DeviceDataSource, WriteTarget};
use freesleep_types::{JsonObject, Side, object_or_empty};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::client::{
    API_DEVICE_STATUS, API_PRESENCE, API_SETTINGS, API_VITALS_SUMMARY, FreeSleepClient,
};
use super::errors::{ApiError, ApiResult};

/// Free Sleep REST adapter implementing [`DeviceDataSource`]
#[derive(Debug, Clone)]
pub struct FreeSleepDeviceAdapter {
    client: Arc<FreeSleepClient>,
}

impl FreeSleepDeviceAdapter {
    pub fn new(client: Arc<FreeSleepClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<FreeSleepClient> {
        &self.client
    }

    async fn get_object(&self, path: &str, section: &str) -> Result<JsonObject> {
        let response = self.client.get(path, &[]).await;
        section_or_empty(response, section).with_context(|| format!("GET {path} failed"))
    }
}

/// A body that is not a JSON object reads as an empty section.
///
/// Transport failures and error statuses still propagate.
fn section_or_empty(response: ApiResult<Value>, section: &str) -> ApiResult<JsonObject> {
    match response {
        Ok(value) => Ok(object_or_empty(value, section)),
        Err(ApiError::InvalidResponse(reason)) => {
            warn!(section, %reason, "Unparseable response, treating section as empty");
            Ok(JsonObject::new())
        }
        Err(e) => Err(e),
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, as the device expects
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn endpoint_for(target: WriteTarget) -> &'static str {
    match target {
        WriteTarget::DeviceStatus => API_DEVICE_STATUS,
        WriteTarget::Settings => API_SETTINGS,
    }
}

#[async_trait]
impl DeviceDataSource for FreeSleepDeviceAdapter {
    fn name(&self) -> &str {
        "free-sleep"
    }

    async fn fetch_device_status(&self) -> Result<JsonObject> {
        self.get_object(API_DEVICE_STATUS, "device_status").await
    }

    async fn fetch_settings(&self) -> Result<JsonObject> {
        self.get_object(API_SETTINGS, "settings").await
    }

    async fn fetch_vitals_summary(
        &self,
        side: Side,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<JsonObject> {
        let params = [
            ("startTime", format_timestamp(start)),
            ("endTime", format_timestamp(end)),
            ("side", side.as_str().to_owned()),
        ];
        let response = self.client.get(API_VITALS_SUMMARY, &params).await;
        section_or_empty(response, "vitals")
            .with_context(|| format!("GET {API_VITALS_SUMMARY} failed for {side} side"))
    }

    async fn fetch_presence(&self) -> Result<JsonObject> {
        self.get_object(API_PRESENCE, "presence").await
    }

    async fn write(&self, target: WriteTarget, payload: JsonObject) -> Result<()> {
        let path = endpoint_for(target);
        let response = self
            .client
            .post(path, &Value::Object(payload))
            .await
            .with_context(|| format!("POST {path} failed"))?;
        debug!(path, ?response, "Write acknowledged");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.client.ping().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn adapter(url: String) -> FreeSleepDeviceAdapter {
        FreeSleepDeviceAdapter::new(Arc::new(FreeSleepClient::from_endpoint(url).unwrap()))
    }

    #[test]
    fn test_format_timestamp() {
        let ts = DateTime::parse_from_rfc3339("2025-10-01T03:04:05.678+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_timestamp(ts), "2025-10-01T03:04:05.678Z");
    }

    #[tokio::test]
    async fn test_non_object_section_is_empty() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", API_PRESENCE)
            .with_status(200)
            .with_body("[1, 2]")
            .create_async()
            .await;

        let presence = adapter(server.url()).fetch_presence().await.unwrap();
        assert!(presence.is_empty());
    }

    #[tokio::test]
    async fn test_non_json_section_is_empty() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", API_SETTINGS)
            .with_status(200)
            .with_body("<html>not found</html>")
            .create_async()
            .await;

        let settings = adapter(server.url()).fetch_settings().await.unwrap();
        assert!(settings.is_empty());
    }

    #[tokio::test]
    async fn test_vitals_query_parameters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", API_VITALS_SUMMARY)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("startTime".into(), "2025-10-01T00:00:00.000Z".into()),
                Matcher::UrlEncoded("endTime".into(), "2025-10-02T00:00:00.000Z".into()),
                Matcher::UrlEncoded("side".into(), "right".into()),
            ]))
            .with_status(200)
            .with_body(json!({"avgHRV": 40}).to_string())
            .create_async()
            .await;

        let end = DateTime::parse_from_rfc3339("2025-10-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let start = end - chrono::Duration::hours(24);
        let vitals = adapter(server.url())
            .fetch_vitals_summary(Side::Right, start, end)
            .await
            .unwrap();

        assert_eq!(vitals["avgHRV"], json!(40));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_routes_by_target() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", API_SETTINGS)
            .match_body(Matcher::Json(json!({"left": {"awayMode": true}})))
            .with_status(200)
            .create_async()
            .await;

        let payload = object_or_empty(json!({"left": {"awayMode": true}}), "payload");
        adapter(server.url())
            .write(WriteTarget::Settings, payload)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_context_names_endpoint() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", API_SETTINGS)
            .with_status(503)
            .create_async()
            .await;

        let err = adapter(server.url()).fetch_settings().await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("/api/settings"), "{message}");
        assert!(message.contains("503"), "{message}");
    }
}
