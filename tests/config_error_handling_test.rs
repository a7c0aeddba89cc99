// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use bess_modbus_simulator::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

#[test]
fn test_config_deserialization_error_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Valid YAML, wrong types
    let invalid_yaml = r#"
modbus:
  enabled: "true"
  port: "not-an-integer"
  address: 12345
  unit_id: 1
"#;
    fs::write(&config_path, invalid_yaml)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    // The sample file holds the defaults and loads cleanly
    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config.modbus.port, 5502);
    assert_eq!(sample_config.simulation.initial_soc, 5000);

    Ok(())
}

#[test]
fn test_config_yaml_syntax_error_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let invalid_yaml = r#"
modbus:
  port: 5502
  address: "0.0.0.0
  enabled: true
"#;
    fs::write(&config_path, invalid_yaml)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");
    assert!(config_path.with_extension("sample.yaml").exists());

    Ok(())
}

#[test]
fn test_config_rule_violation_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("bess.yaml");

    // Schema valid, but the initial SoC lies outside its bounds
    let yaml = r#"
simulation:
  enabled: true
  update_interval_ms: 1000
  initial_soc: 9900
  soc_min: 1000
  soc_max: 9500
  soc_period_secs: 60
  watchdog_timeout_ticks: 10
"#;
    fs::write(&config_path, yaml)?;

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(format!("{:#}", err).contains("outside"));
    assert!(temp_dir.path().join("bess.sample.yaml").exists());

    Ok(())
}

#[test]
fn test_sample_file_created_in_nested_directory() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let nested = temp_dir.path().join("etc").join("bess");
    fs::create_dir_all(&nested)?;
    let config_path = nested.join("config.yaml");

    fs::write(&config_path, "identity: 42\n")?;

    assert!(Config::from_file(&config_path).is_err());
    assert!(nested.join("config.sample.yaml").exists());

    Ok(())
}
