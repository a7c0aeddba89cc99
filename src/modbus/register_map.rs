// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register map of the simulated battery energy storage system
//!
//! Addresses are zero-based and used as-is on the wire. Every point is a
//! signed 32-bit value spread over two registers, high word first.
//!
//! ### Holding Registers (Read/Write, function codes 03/06/16)
//!
//! | Address | Description | Unit |
//! |---------|-------------|------|
//! | 0xD000-0xD001 | Watchdog | - |
//! | 0xD002-0xD003 | System command | - |
//! | 0xD004-0xD005 | Active power setpoint | kW |
//! | 0xD006-0xD007 | Reactive power setpoint | kVar |
//! | 0xD00A-0xD00B | Clear faults | - |
//!
//! ### Input Registers (Read Only, function code 04)
//!
//! | Address | Description | Unit |
//! |---------|-------------|------|
//! | 0x2502-0x2503 | System state | - |
//! | 0x2504-0x2505 | State of charge | % × 100 |
//! | 0x2518-0x2519 | Measured active power | kW |
//! | 0x251A-0x251B | Measured reactive power | kVar |

use std::fmt::Write;

/// Watchdog written periodically by the supervisory controller.
pub const HR_WATCHDOG: u16 = 0xD000;
/// System command (start, stop, standby...).
pub const HR_COMMAND: u16 = 0xD002;
/// Active power setpoint in kW.
pub const HR_P_SETPOINT: u16 = 0xD004;
/// Reactive power setpoint in kVar.
pub const HR_Q_SETPOINT: u16 = 0xD006;
/// Clear faults request.
pub const HR_CLEAR_FAULTS: u16 = 0xD00A;

/// System state, mirror of [`HR_COMMAND`].
pub const IR_STATE: u16 = 0x2502;
/// State of charge in percent × 100.
pub const IR_SOC: u16 = 0x2504;
/// Measured active power, mirror of [`HR_P_SETPOINT`].
pub const IR_P_MEASURED: u16 = 0x2518;
/// Measured reactive power, mirror of [`HR_Q_SETPOINT`].
pub const IR_Q_MEASURED: u16 = 0x251A;

/// Register bank a point lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bank {
    Coils,
    DiscreteInputs,
    HoldingRegisters,
    InputRegisters,
}

impl Bank {
    pub fn name(&self) -> &'static str {
        match self {
            Bank::Coils => "coils",
            Bank::DiscreteInputs => "discrete inputs",
            Bank::HoldingRegisters => "holding registers",
            Bank::InputRegisters => "input registers",
        }
    }
}

/// A 32-bit point of the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterPoint {
    pub bank: Bank,
    /// Address of the high word; the low word follows at `address + 1`.
    pub address: u16,
    pub name: &'static str,
    pub description: &'static str,
}

impl RegisterPoint {
    const fn new(bank: Bank, address: u16, name: &'static str, description: &'static str) -> Self {
        Self {
            bank,
            address,
            name,
            description,
        }
    }

    /// Both register addresses covered by this point.
    pub fn addresses(&self) -> [u16; 2] {
        [self.address, self.address + 1]
    }
}

const POINTS: [RegisterPoint; 9] = [
    RegisterPoint::new(Bank::HoldingRegisters, HR_WATCHDOG, "watchdog", "Watchdog (int32)"),
    RegisterPoint::new(Bank::HoldingRegisters, HR_COMMAND, "command", "System command (int32)"),
    RegisterPoint::new(
        Bank::HoldingRegisters,
        HR_P_SETPOINT,
        "p_setpoint",
        "Active power setpoint kW (signed int32)",
    ),
    RegisterPoint::new(
        Bank::HoldingRegisters,
        HR_Q_SETPOINT,
        "q_setpoint",
        "Reactive power setpoint kVar (signed int32)",
    ),
    RegisterPoint::new(
        Bank::HoldingRegisters,
        HR_CLEAR_FAULTS,
        "clear_faults",
        "Clear faults (int32)",
    ),
    RegisterPoint::new(Bank::InputRegisters, IR_STATE, "state", "System state (int32)"),
    RegisterPoint::new(Bank::InputRegisters, IR_SOC, "soc", "State of charge % × 100 (int32)"),
    RegisterPoint::new(
        Bank::InputRegisters,
        IR_P_MEASURED,
        "p_measured",
        "Measured active power kW (signed int32)",
    ),
    RegisterPoint::new(
        Bank::InputRegisters,
        IR_Q_MEASURED,
        "q_measured",
        "Measured reactive power kVar (signed int32)",
    ),
];

/// Commands mirrored into measurements by the simulator: `(source, destination)`.
pub const MIRRORS: [(u16, u16); 3] = [
    (HR_COMMAND, IR_STATE),
    (HR_P_SETPOINT, IR_P_MEASURED),
    (HR_Q_SETPOINT, IR_Q_MEASURED),
];

/// Every point of the register map, holding registers first.
pub fn all_points() -> &'static [RegisterPoint] {
    &POINTS
}

/// Look a point up by its name.
pub fn point_by_name(name: &str) -> Option<&'static RegisterPoint> {
    POINTS.iter().find(|p| p.name == name)
}

/// Every mapped register address.
///
/// The same layout is used to seed all four banks of the data store.
pub fn seed_addresses() -> Vec<u16> {
    POINTS.iter().flat_map(|p| p.addresses()).collect()
}

/// Human readable register map, printed at startup.
pub fn describe() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Holding Registers (function 03/06/16, read/write):");
    for point in POINTS.iter().filter(|p| p.bank == Bank::HoldingRegisters) {
        let _ = writeln!(
            out,
            "  0x{:04x}-0x{:04x}: {}",
            point.address,
            point.address + 1,
            point.description
        );
    }
    let _ = writeln!(out, "Input Registers (function 04, read only):");
    for point in POINTS.iter().filter(|p| p.bank == Bank::InputRegisters) {
        let _ = writeln!(
            out,
            "  0x{:04x}-0x{:04x}: {}",
            point.address,
            point.address + 1,
            point.description
        );
    }
    let _ = writeln!(out, "Live mirrors:");
    for (src, dst) in MIRRORS {
        let _ = writeln!(out, "  0x{:04x} -> 0x{:04x}", src, dst);
    }
    out
}
