// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::Config;
use crate::modbus::device_identification::MAX_OBJECT_LEN;

/// Upper bound of the state of charge (100.00 %).
pub const SOC_FULL_SCALE: i32 = 10_000;

/// JSON schema embedded in the binary.
pub(crate) const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./bess_modbus_simulator --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Port Range**: the Modbus port is within 1-65534
/// - **IP Address Format**: a warning is logged for unusual bind addresses
/// - **State of charge bounds**: `0 <= soc_min <= initial_soc <= soc_max <= 10000`
/// - **Timing**: the update interval is non-zero and the SoC period lasts at least 2 seconds
/// - **Watchdog**: at least one tick before a timeout is reported
/// - **Identity**: every string fits in one device identification object (bytes, not chars)
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.modbus.port < 1 || config.modbus.port > 65534 {
        anyhow::bail!("Invalid Modbus port number: {}", config.modbus.port);
    }

    if !is_valid_ip_address(&config.modbus.address) {
        warn!(
            "Potentially invalid Modbus address format: {}",
            config.modbus.address
        );
    }

    let sim = &config.simulation;
    if sim.soc_min < 0 || sim.soc_max > SOC_FULL_SCALE || sim.soc_min > sim.soc_max {
        anyhow::bail!(
            "Invalid state of charge bounds: soc_min={} soc_max={} (expected 0 <= min <= max <= {})",
            sim.soc_min,
            sim.soc_max,
            SOC_FULL_SCALE
        );
    }

    if sim.initial_soc < sim.soc_min || sim.initial_soc > sim.soc_max {
        anyhow::bail!(
            "Initial state of charge {} is outside [{}, {}]",
            sim.initial_soc,
            sim.soc_min,
            sim.soc_max
        );
    }

    if sim.update_interval_ms == 0 {
        anyhow::bail!("Simulation update interval must be greater than zero");
    }

    if sim.soc_period_secs < 2 {
        anyhow::bail!(
            "State of charge period must last at least 2 seconds, got {}",
            sim.soc_period_secs
        );
    }

    if sim.watchdog_timeout_ticks == 0 {
        anyhow::bail!("Watchdog timeout must be at least one tick");
    }

    let identity = &config.identity;
    for (name, value) in [
        ("vendor_name", &identity.vendor_name),
        ("product_code", &identity.product_code),
        ("major_minor_revision", &identity.major_minor_revision),
        ("vendor_url", &identity.vendor_url),
        ("product_name", &identity.product_name),
        ("model_name", &identity.model_name),
        ("user_application_name", &identity.user_application_name),
    ] {
        if value.len() > MAX_OBJECT_LEN {
            anyhow::bail!(
                "Identity field {} is {} bytes long, at most {} bytes fit in a Modbus response",
                name,
                value.len(),
                MAX_OBJECT_LEN
            );
        }
    }

    Ok(())
}
