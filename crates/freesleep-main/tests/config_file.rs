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

use freesleep_main::config::{AppConfig, save_config};
use freesleep_types::{RefreshMode, VitalsMode};
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

#[test]
fn loads_full_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[device]
base_url = "http://192.168.1.50"
port = 3001

[polling]
update_interval_secs = 30
refresh_mode = "interval"
write_refresh_delay_secs = 5
fetch_presence = false

[vitals]
enabled = true
mode = "nightly"
window_hours = 12
poll_secs = 600
nightly_time = "04:30"
"#
    )
    .unwrap();

    let config = AppConfig::from_file(file.path()).unwrap();
    let options = config.to_options();

    assert_eq!(options.endpoint(), "http://192.168.1.50:3001");
    assert_eq!(options.update_interval_secs, 30);
    assert_eq!(options.refresh_mode, RefreshMode::Interval);
    assert_eq!(options.write_refresh_delay_secs, 5);
    assert!(!options.fetch_presence);
    assert_eq!(options.vitals_mode, VitalsMode::Nightly);
    assert_eq!(options.vitals_window_hours, 12);
    assert_eq!(options.vitals_poll_secs, 600);
    assert_eq!(options.nightly_time().to_string(), "04:30");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn invalid_toml_is_reported() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[device\nport = ").unwrap();

    let err = AppConfig::from_file(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config TOML"));
}

#[test]
fn save_then_load_keeps_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("freesleep.toml");

    let mut config = AppConfig::default();
    config.device.base_url = "http://pod.local".to_owned();
    config.vitals.mode = VitalsMode::Nightly;
    config.vitals.nightly_time = "01:45".to_owned();

    save_config(&config, &path).unwrap();
    assert!(!path.with_extension("tmp").exists());
    assert_eq!(AppConfig::from_file(&path).unwrap(), config);
}
