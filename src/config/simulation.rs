// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration of the battery simulation loop

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters of the periodic battery simulation.
///
/// State of charge values are expressed in percent × 100 (5000 = 50.00 %).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Enable or disable the simulation loop.
    ///
    /// When disabled the server still answers requests but the input
    /// registers never change.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Delay between two simulation steps in milliseconds.
    pub update_interval_ms: u64,

    /// State of charge at startup.
    pub initial_soc: i32,

    /// Lowest reachable state of charge.
    pub soc_min: i32,

    /// Highest reachable state of charge.
    pub soc_max: i32,

    /// Length in seconds of a full discharge/charge cycle.
    ///
    /// The battery discharges during the first half of every period
    /// (wall clock aligned) and charges during the second half.
    pub soc_period_secs: u64,

    /// Number of consecutive steps without a watchdog before a timeout is reported.
    pub watchdog_timeout_ticks: u32,
}

fn default_enabled() -> bool {
    true
}

impl SimulationConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            update_interval_ms: 1000,
            initial_soc: 5000,
            soc_min: 1000,
            soc_max: 9500,
            soc_period_secs: 60,
            watchdog_timeout_ticks: 10,
        }
    }
}
