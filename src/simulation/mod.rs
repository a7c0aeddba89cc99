// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Battery simulation
//!
//! The simulator periodically turns the commands written by the supervisory
//! controller into "measurements" exposed through the input registers:
//!
//! - `0xD002` command → `0x2502` system state
//! - `0xD004` P setpoint → `0x2518` measured P
//! - `0xD006` Q setpoint → `0x251A` measured Q
//!
//! It also keeps the state of charge moving between its bounds and reports
//! missing watchdogs.

pub mod bess_simulator;
pub mod clock;

pub use bess_simulator::{BessSimulator, StepReport};
pub use clock::{Clock, SystemClock};
