// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use bess_modbus_simulator::config::Config;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_missing_file_creates_default_config() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    assert!(!config_path.exists());

    let config = Config::from_file(&config_path)?;
    assert!(config_path.exists(), "Default config file was not written");

    assert!(config.modbus.enabled);
    assert_eq!(config.modbus.port, 5502);
    assert_eq!(config.modbus.address, "0.0.0.0");
    assert_eq!(config.simulation.update_interval_ms, 1000);
    assert_eq!(config.identity.vendor_name, "BESS Simulator");

    // Loading the written file again gives the same values
    let reloaded = Config::from_file(&config_path)?;
    assert_eq!(reloaded.modbus.port, config.modbus.port);
    assert_eq!(
        reloaded.identity.product_code,
        config.identity.product_code
    );

    Ok(())
}

#[test]
fn test_save_and_load_custom_values() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("custom.yaml");

    let mut config = Config::default();
    config.modbus.port = 1502;
    config.modbus.address = "127.0.0.1".to_string();
    config.simulation.soc_period_secs = 120;
    config.simulation.watchdog_timeout_ticks = 3;
    config.identity.model_name = "Container 2 MWh".to_string();
    config.save_to_file(&config_path)?;

    let loaded = Config::from_file(&config_path)?;
    assert_eq!(loaded.modbus.port, 1502);
    assert_eq!(loaded.modbus.address, "127.0.0.1");
    assert_eq!(loaded.simulation.soc_period_secs, 120);
    assert_eq!(loaded.simulation.watchdog_timeout_ticks, 3);
    assert_eq!(loaded.identity.model_name, "Container 2 MWh");

    Ok(())
}

#[test]
fn test_partial_file_keeps_other_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let yaml = r#"
modbus:
  enabled: true
  port: 15502
  address: "::1"
  unit_id: 7
"#;
    fs::write(&config_path, yaml)?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.modbus.port, 15502);
    assert_eq!(config.modbus.unit_id, 7);
    assert_eq!(config.modbus.socket_address(), "[::1]:15502");
    assert_eq!(config.simulation.initial_soc, 5000);

    Ok(())
}

#[test]
fn test_apply_args_after_loading() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config::from_file(&config_path)?;
    config.apply_args(Some("127.0.0.1".to_string()), Some(1502), Some(250))?;

    assert_eq!(config.modbus.socket_address(), "127.0.0.1:1502");
    assert_eq!(config.simulation.update_interval_ms, 250);

    Ok(())
}

#[test]
fn test_zero_interval_override_is_rejected() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config::from_file(&config_path)?;
    let err = config.apply_args(None, None, Some(0)).unwrap_err();
    assert!(format!("{:#}", err).contains("update interval"));

    let mut config = Config::from_file(&config_path)?;
    assert!(config.apply_args(None, Some(0), None).is_err());

    Ok(())
}
