// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! BESS Modbus simulator library
//!
//! This library simulates a Battery Energy Storage System behind a Modbus TCP
//! server: a supervisory controller writes watchdog, command and power setpoints
//! into holding registers, and reads back the mirrored state, measured powers and
//! a slowly varying state of charge from input registers.

pub mod config;
pub mod daemon;
pub mod modbus;
pub mod simulation;
pub mod utility;
