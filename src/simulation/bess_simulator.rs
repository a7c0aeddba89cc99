// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Battery simulation step
//!
//! Every step copies the controller's commands from the holding registers into
//! the matching input registers, checks the watchdog and moves the state of
//! charge by one unit (0.01 %). The battery discharges during the first half of
//! every `soc_period_secs` window and charges during the second half.

use log::{debug, warn};

use crate::config::SimulationConfig;
use crate::modbus::datastore::{self, DataStoreError, SharedDataStore};
use crate::modbus::register_map::{self, Bank};

use super::clock::Clock;

/// Outcome of a single simulation step, mostly useful for tests and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub state: i32,
    pub p_measured: i32,
    pub q_measured: i32,
    pub watchdog: i32,
    /// Consecutive steps without a non-zero watchdog.
    pub watchdog_misses: u32,
    pub watchdog_expired: bool,
    pub soc: i32,
}

/// Simulated battery driving the input registers of a shared data store.
pub struct BessSimulator<C: Clock> {
    store: SharedDataStore,
    config: SimulationConfig,
    clock: C,
    soc: i32,
    watchdog_misses: u32,
}

impl<C: Clock> BessSimulator<C> {
    pub fn new(store: SharedDataStore, config: SimulationConfig, clock: C) -> Self {
        let soc = config.initial_soc.clamp(config.soc_min, config.soc_max);
        Self {
            store,
            config,
            clock,
            soc,
            watchdog_misses: 0,
        }
    }

    pub fn soc(&self) -> i32 {
        self.soc
    }

    /// -1 while discharging, +1 while charging.
    fn soc_direction(&self, unix_seconds: u64) -> i32 {
        let period = self.config.soc_period_secs.max(2);
        if unix_seconds % period < period / 2 {
            -1
        } else {
            1
        }
    }

    /// Run one simulation step.
    ///
    /// The data store lock is held for the whole step so that clients never
    /// observe a half-updated register map.
    pub fn step(&mut self) -> Result<StepReport, DataStoreError> {
        let now = self.clock.unix_seconds();
        let mut store = datastore::lock(&self.store)?;

        let mut mirrored = [0i32; 3];
        for (slot, (src, dst)) in mirrored.iter_mut().zip(register_map::MIRRORS) {
            let value = store.read_i32(Bank::HoldingRegisters, src)?;
            store.write_i32(Bank::InputRegisters, dst, value)?;
            *slot = value;
        }

        let watchdog = store.read_i32(Bank::HoldingRegisters, register_map::HR_WATCHDOG)?;
        if watchdog != 0 {
            self.watchdog_misses = 0;
            debug!("Watchdog received: {}", watchdog);
        } else {
            self.watchdog_misses = self.watchdog_misses.saturating_add(1);
        }
        let watchdog_expired = self.watchdog_misses > self.config.watchdog_timeout_ticks;
        if watchdog_expired {
            warn!(
                "Watchdog timeout: no watchdog for {} steps",
                self.watchdog_misses
            );
        }

        let direction = self.soc_direction(now);
        self.soc = (self.soc + direction).clamp(self.config.soc_min, self.config.soc_max);
        store.write_i32(Bank::InputRegisters, register_map::IR_SOC, self.soc)?;

        let [state, p_measured, q_measured] = mirrored;
        debug!(
            "Simulation step: state={} P={} kW Q={} kVar SoC={:.2}%",
            state,
            p_measured,
            q_measured,
            self.soc as f32 / 100.0
        );

        Ok(StepReport {
            state,
            p_measured,
            q_measured,
            watchdog,
            watchdog_misses: self.watchdog_misses,
            watchdog_expired,
            soc: self.soc,
        })
    }
}
