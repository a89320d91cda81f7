// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_modbus_gateway::config::{Config, ModbusConfig};
use rust_modbus_gateway::network::StationConfig;
use rust_modbus_gateway::registers::WifiMode;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    // Create a temporary directory
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let mut config = Config {
        modbus: ModbusConfig {
            enabled: true,
            port: 1502,
            address: "192.168.1.1".to_string(),
            unit_id: 7,
        },
        ..Default::default()
    };
    config.network.mode = WifiMode::AccessPointStation;
    config.network.station = Some(StationConfig {
        ssid: "plant-floor".to_string(),
        password: "secret-pass".to_string(),
    });
    config.gateway.init_retry_backoff_ms = 250;

    // Save config to file
    config.save_to_file(&config_path)?;

    // Load config from file
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);
    assert_eq!(
        loaded_config.gateway.init_retry_backoff(),
        Duration::from_millis(250)
    );

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    // Verify default config was created
    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(default_config.modbus.port, 502);
    assert_eq!(default_config.modbus.address, "0.0.0.0");

    // The file written for a missing path loads back unchanged
    assert_eq!(Config::from_file(&non_existent_path)?, Config::default());

    Ok(())
}

#[test]
fn test_partial_and_empty_files_use_defaults() -> Result<()> {
    let temp_dir = tempdir()?;

    let empty_path = temp_dir.path().join("empty.yaml");
    fs::write(&empty_path, "")?;
    assert_eq!(Config::from_file(&empty_path)?, Config::default());

    let partial_path = temp_dir.path().join("partial.yaml");
    fs::write(
        &partial_path,
        r#"
network:
  mode: access_point
  access_point:
    ssid: "line-3"
    channel: 11
"#,
    )?;
    let config = Config::from_file(&partial_path)?;
    assert_eq!(config.network.mode, WifiMode::AccessPoint);
    assert_eq!(config.network.access_point.ssid, "line-3");
    assert_eq!(config.network.access_point.channel, 11);
    assert_eq!(config.network.access_point.max_clients, 4);
    assert_eq!(config.modbus, ModbusConfig::default());
    assert_eq!(config.gateway.stop_grace_period(), Duration::from_secs(5));
    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();
    assert!(config.modbus.enabled);

    // Nothing provided, nothing changes
    config.apply_args(None, None, None);
    assert_eq!(config, Config::default());

    // Apply command-line arguments
    config.apply_args(Some(false), Some("127.0.0.1".to_string()), Some(1502));

    // Verify values were overridden
    assert!(!config.modbus.enabled);
    assert_eq!(config.modbus.address, "127.0.0.1");
    assert_eq!(config.modbus.port, 1502);
}

#[test]
fn test_config_validation() -> Result<()> {
    // Valid config
    let valid_config = Config::default();
    assert!(valid_config.validate().is_ok());

    // Privileged ports other than 502 are refused
    let mut invalid_port_config = Config::default();
    invalid_port_config.modbus.port = 80;
    assert!(invalid_port_config.validate().is_err());
    invalid_port_config.modbus.port = 1024;
    assert!(invalid_port_config.validate().is_ok());

    let mut invalid_address_config = Config::default();
    invalid_address_config.modbus.address = "not-an-address".to_string();
    assert!(invalid_address_config.validate().is_err());
    invalid_address_config.modbus.address = "localhost".to_string();
    assert!(invalid_address_config.validate().is_ok());

    // SSIDs must fit the 32-byte register field
    let mut long_ssid_config = Config::default();
    long_ssid_config.network.station = Some(StationConfig {
        ssid: "x".repeat(33),
        password: String::new(),
    });
    assert!(long_ssid_config.validate().is_err());

    // Access point password is open or WPA2 sized
    let mut short_password_config = Config::default();
    short_password_config.network.access_point.password = "short".to_string();
    assert!(short_password_config.validate().is_err());
    short_password_config.network.access_point.password = "long-enough".to_string();
    assert!(short_password_config.validate().is_ok());

    Ok(())
}

#[test]
fn test_gateway_settings() -> Result<()> {
    let mut config = Config::default();
    config.modbus.address = "localhost".to_string();
    config.modbus.port = 1502;
    config.gateway.poll_interval_ms = 20;

    let settings = config.gateway_settings()?;
    assert_eq!(settings.transport.socket_addr().to_string(), "127.0.0.1:1502");
    assert_eq!(settings.transport.unit_id, 1);
    assert_eq!(settings.poll_interval, Duration::from_millis(20));
    assert_eq!(settings.status_interval, Duration::from_secs(1));

    config.modbus.address = "nowhere".to_string();
    assert!(config.gateway_settings().is_err());
    Ok(())
}
