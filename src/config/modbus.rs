// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP server configuration
//!
//! This module defines the structures for configuring the Modbus TCP server
//! exposing the simulated battery.

use serde::{Deserialize, Serialize};

/// Configuration for the Modbus TCP server component.
///
/// # Example
///
/// ```
/// use bess_modbus_simulator::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     enabled: true,
///     port: 1502,
///     address: "127.0.0.1".to_string(),
///     unit_id: 1,
/// };
/// assert_eq!(modbus_config.socket_address(), "127.0.0.1:1502");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable the Modbus server.
    ///
    /// The simulator is useless without it, so it is enabled by default.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Valid range is 1-65534. Default value is 5502.
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// Default is "0.0.0.0" so that the container port mapping works.
    pub address: String,

    /// Server id returned by the Report Server ID function (0x11).
    ///
    /// Requests are answered whatever unit id they carry.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
}

fn default_enabled() -> bool {
    true
}

fn default_unit_id() -> u8 {
    1
}

impl ModbusConfig {
    /// `address:port` string the listener binds to.
    pub fn socket_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            // Bare IPv6 literal
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 5502,
            address: "0.0.0.0".to_string(),
            unit_id: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_binds_all_interfaces_on_5502() {
        let config = ModbusConfig::default();
        assert_eq!(config.socket_address(), "0.0.0.0:5502");
        assert!(config.enabled);
    }

    #[test]
    fn test_ipv6_socket_address() {
        let config = ModbusConfig {
            address: "::1".to_string(),
            ..Default::default()
        };
        assert_eq!(config.socket_address(), "[::1]:5502");
    }
}
