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

//! Coordinator driven against a mocked Free Sleep device over HTTP

use freesleep_adapters::{
    API_DEVICE_STATUS, API_PRESENCE, API_SETTINGS, API_VITALS_SUMMARY, FreeSleepClient,
    FreeSleepDeviceAdapter,
};
use freesleep_core::entities::SideClimate;
use freesleep_core::{Coordinator, CoordinatorEvent, Entity, EntityState, IntegrationContext};
use freesleep_types::{FreeSleepOptions, Section, Side};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn mock_json(server: &mut ServerGuard, path: &str, body: serde_json::Value) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

fn coordinator_for(server: &ServerGuard) -> Arc<Coordinator> {
    let client = FreeSleepClient::from_endpoint(server.url()).unwrap();
    let adapter = Arc::new(FreeSleepDeviceAdapter::new(Arc::new(client)));
    let context = IntegrationContext::new("free_sleep_it", FreeSleepOptions::default(), adapter);
    Coordinator::new(context)
}

async fn wait_until_matched(mock: &Mock) {
    for _ in 0..200 {
        if mock.matched_async().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("request never reached the mock server");
}

#[tokio::test]
async fn device_status_500_keeps_previous_snapshot() {
    let mut server = Server::new_async().await;
    let status = mock_json(
        &mut server,
        API_DEVICE_STATUS,
        json!({"left": {"currentTemperatureF": 80, "targetTemperatureF": 82, "isOn": true}}),
    )
    .await;
    let _settings = mock_json(&mut server, API_SETTINGS, json!({"left": {"name": "Jo"}})).await;
    let _presence = mock_json(&mut server, API_PRESENCE, json!({"left": {"present": true}})).await;
    let _vitals = mock_json(&mut server, API_VITALS_SUMMARY, json!({"avgHeartRate": 60})).await;

    let coordinator = coordinator_for(&server);
    coordinator.refresh().await.unwrap();
    let before = coordinator.snapshot();
    assert!(before.vitals.is_some());

    status.remove_async().await;
    let failing = server
        .mock("GET", API_DEVICE_STATUS)
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let mut events = coordinator.subscribe();
    let err = coordinator.refresh().await.unwrap_err();
    assert!(format!("{err:#}").contains("500"));

    assert_eq!(coordinator.snapshot(), before);
    assert!(!coordinator.last_update_success());
    assert!(matches!(
        events.recv().await.unwrap(),
        CoordinatorEvent::UpdateFailed { .. }
    ));
    failing.assert_async().await;

    // Entities keep rendering the last good data but report unavailable
    let climate = SideClimate::new(&coordinator, Side::Left);
    assert!(matches!(climate.state(), EntityState::Climate(_)));
    assert!(!climate.available());
}

#[tokio::test]
async fn optimistic_write_posts_payload() {
    let mut server = Server::new_async().await;
    let _status = mock_json(
        &mut server,
        API_DEVICE_STATUS,
        json!({"left": {"currentTemperatureF": 80, "targetTemperatureF": 82, "isOn": true}}),
    )
    .await;
    let _settings = mock_json(&mut server, API_SETTINGS, json!({})).await;
    let _presence = mock_json(&mut server, API_PRESENCE, json!({})).await;
    let _vitals = mock_json(&mut server, API_VITALS_SUMMARY, json!({})).await;
    let post = server
        .mock("POST", API_DEVICE_STATUS)
        .match_body(Matcher::Json(json!({"left": {"targetTemperatureF": 55.0}})))
        .with_status(200)
        .create_async()
        .await;

    let coordinator = coordinator_for(&server);
    coordinator.refresh().await.unwrap();

    let climate = SideClimate::new(&coordinator, Side::Left);
    assert_eq!(climate.set_temperature(40.0).unwrap(), 55.0);
    coordinator.with_snapshot(|s| {
        let left = s.side(Section::DeviceStatus, Side::Left).unwrap();
        assert_eq!(left["targetTemperatureF"], json!(55.0));
    });

    wait_until_matched(&post).await;
    post.assert_async().await;
}

#[tokio::test]
async fn failed_post_is_not_rolled_back() {
    let mut server = Server::new_async().await;
    let _status = mock_json(&mut server, API_DEVICE_STATUS, json!({})).await;
    let _settings = mock_json(&mut server, API_SETTINGS, json!({"linkBothSides": false})).await;
    let _presence = mock_json(&mut server, API_PRESENCE, json!({})).await;
    let _vitals = mock_json(&mut server, API_VITALS_SUMMARY, json!({})).await;
    let post = server
        .mock("POST", API_SETTINGS)
        .with_status(500)
        .create_async()
        .await;

    let coordinator = coordinator_for(&server);
    coordinator.refresh().await.unwrap();

    let switch = freesleep_core::entities::LinkBothSidesSwitch::new(&coordinator);
    switch.set(true);
    wait_until_matched(&post).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(switch.state(), EntityState::Binary { is_on: true });
}

#[tokio::test]
async fn non_json_presence_body_does_not_fail_refresh() {
    let mut server = Server::new_async().await;
    let _status = mock_json(
        &mut server,
        API_DEVICE_STATUS,
        json!({"left": {"currentTemperatureF": 80, "targetTemperatureF": 82, "isOn": true}}),
    )
    .await;
    let _settings = mock_json(&mut server, API_SETTINGS, json!({})).await;
    let _vitals = mock_json(&mut server, API_VITALS_SUMMARY, json!({"avgHeartRate": 60})).await;
    let _presence = server
        .mock("GET", API_PRESENCE)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>not found</html>")
        .create_async()
        .await;

    let coordinator = coordinator_for(&server);
    coordinator.refresh().await.unwrap();

    assert!(coordinator.last_update_success());
    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.presence, Some(serde_json::Map::new()));
    assert!(snapshot.side(Section::DeviceStatus, Side::Left).is_some());
}
