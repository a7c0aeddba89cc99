// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device identification strings
//!
//! Served through the Read Device Identification function (0x2B / MEI 0x0E).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub vendor_name: String,
    pub product_code: String,
    /// Defaults to the crate version.
    pub major_minor_revision: String,
    pub vendor_url: String,
    pub product_name: String,
    pub model_name: String,
    pub user_application_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            vendor_name: "BESS Simulator".to_string(),
            product_code: "BESS-SIM".to_string(),
            major_minor_revision: env!("CARGO_PKG_VERSION").to_string(),
            vendor_url: "https://github.com/bess-simulator".to_string(),
            product_name: "Battery Energy Storage System Simulator".to_string(),
            model_name: "BESS Model 1".to_string(),
            user_application_name: "bess-modbus-simulator".to_string(),
        }
    }
}
