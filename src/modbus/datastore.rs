// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sparse Modbus data store
//!
//! Only the addresses of the register map exist; any request touching another
//! address is rejected with `IllegalDataAddress`. The four banks (coils,
//! discrete inputs, holding registers and input registers) share the same
//! address layout.
//!
//! The store is shared between every client connection and the simulator
//! through [`SharedDataStore`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, error};
use thiserror::Error;
use tokio_modbus::prelude::ExceptionCode;

use super::register_map::{self, Bank};
use crate::utility::{merge_i32, split_i32};

/// Maximum number of registers in a single read request.
pub const MAX_READ_REGISTERS: u16 = 125;
/// Maximum number of registers in a single write request.
pub const MAX_WRITE_REGISTERS: u16 = 123;
/// Maximum number of registers written by a Read/Write Multiple Registers request.
pub const MAX_READ_WRITE_REGISTERS: u16 = 121;
/// Maximum number of bits in a single read request.
pub const MAX_READ_BITS: u16 = 2000;
/// Maximum number of bits in a single write request.
pub const MAX_WRITE_BITS: u16 = 1968;

/// Errors raised while accessing the data store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataStoreError {
    #[error("Address 0x{address:04x} is not mapped in {bank}")]
    UnmappedAddress { bank: &'static str, address: u16 },

    #[error("Address range starting at 0x{start:04x} with {count} items overflows")]
    AddressOverflow { start: u16, count: u16 },

    #[error("Invalid quantity {count} (allowed 1..={max})")]
    InvalidQuantity { count: u16, max: u16 },

    #[error("Bank {bank} is not a {expected} bank")]
    WrongBankKind {
        bank: &'static str,
        expected: &'static str,
    },

    #[error("Data store lock poisoned")]
    Poisoned,
}

impl From<DataStoreError> for ExceptionCode {
    fn from(err: DataStoreError) -> Self {
        match err {
            DataStoreError::UnmappedAddress { .. } | DataStoreError::AddressOverflow { .. } => {
                ExceptionCode::IllegalDataAddress
            }
            DataStoreError::InvalidQuantity { .. } => ExceptionCode::IllegalDataValue,
            DataStoreError::WrongBankKind { .. } => ExceptionCode::IllegalFunction,
            DataStoreError::Poisoned => ExceptionCode::ServerDeviceFailure,
        }
    }
}

/// Register and bit banks of the simulated device.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    coils: HashMap<u16, bool>,
    discrete_inputs: HashMap<u16, bool>,
    holding_registers: HashMap<u16, u16>,
    input_registers: HashMap<u16, u16>,
}

/// Data store shared between connections and the simulator.
pub type SharedDataStore = Arc<Mutex<DataStore>>;

impl DataStore {
    /// Create a store seeded with the register map.
    ///
    /// Every mapped address starts at zero, except the state of charge which
    /// holds `initial_soc`. Bit banks are seeded from the same values
    /// (`true` when the register value is non-zero).
    pub fn new(initial_soc: i32) -> Self {
        let mut registers: HashMap<u16, u16> = register_map::seed_addresses()
            .into_iter()
            .map(|addr| (addr, 0))
            .collect();
        let [hi, lo] = split_i32(initial_soc);
        registers.insert(register_map::IR_SOC, hi);
        registers.insert(register_map::IR_SOC + 1, lo);

        let bits: HashMap<u16, bool> = registers.iter().map(|(&a, &v)| (a, v != 0)).collect();

        debug!(
            "Data store initialized with {} addresses per bank",
            registers.len()
        );

        Self {
            coils: bits.clone(),
            discrete_inputs: bits,
            holding_registers: registers.clone(),
            input_registers: registers,
        }
    }

    /// Wrap the store for sharing between tasks.
    pub fn into_shared(self) -> SharedDataStore {
        Arc::new(Mutex::new(self))
    }

    fn registers(&self, bank: Bank) -> Result<&HashMap<u16, u16>, DataStoreError> {
        match bank {
            Bank::HoldingRegisters => Ok(&self.holding_registers),
            Bank::InputRegisters => Ok(&self.input_registers),
            _ => Err(DataStoreError::WrongBankKind {
                bank: bank.name(),
                expected: "register",
            }),
        }
    }

    fn registers_mut(&mut self, bank: Bank) -> Result<&mut HashMap<u16, u16>, DataStoreError> {
        match bank {
            Bank::HoldingRegisters => Ok(&mut self.holding_registers),
            Bank::InputRegisters => Ok(&mut self.input_registers),
            _ => Err(DataStoreError::WrongBankKind {
                bank: bank.name(),
                expected: "register",
            }),
        }
    }

    fn bits(&self, bank: Bank) -> Result<&HashMap<u16, bool>, DataStoreError> {
        match bank {
            Bank::Coils => Ok(&self.coils),
            Bank::DiscreteInputs => Ok(&self.discrete_inputs),
            _ => Err(DataStoreError::WrongBankKind {
                bank: bank.name(),
                expected: "bit",
            }),
        }
    }

    fn bits_mut(&mut self, bank: Bank) -> Result<&mut HashMap<u16, bool>, DataStoreError> {
        match bank {
            Bank::Coils => Ok(&mut self.coils),
            Bank::DiscreteInputs => Ok(&mut self.discrete_inputs),
            _ => Err(DataStoreError::WrongBankKind {
                bank: bank.name(),
                expected: "bit",
            }),
        }
    }

    /// Read `count` registers starting at `addr`.
    pub fn read_registers(
        &self,
        bank: Bank,
        addr: u16,
        count: u16,
    ) -> Result<Vec<u16>, DataStoreError> {
        check_quantity(count, MAX_READ_REGISTERS)?;
        read_sparse(self.registers(bank)?, bank, addr, count)
    }

    /// Write `values` to consecutive registers starting at `addr`.
    ///
    /// Nothing is written unless every target address is mapped.
    pub fn write_registers(
        &mut self,
        bank: Bank,
        addr: u16,
        values: &[u16],
    ) -> Result<(), DataStoreError> {
        let count = quantity_of(values.len(), MAX_WRITE_REGISTERS)?;
        check_quantity(count, MAX_WRITE_REGISTERS)?;
        write_sparse(self.registers_mut(bank)?, bank, addr, values)
    }

    /// Read `count` bits starting at `addr`.
    pub fn read_bits(&self, bank: Bank, addr: u16, count: u16) -> Result<Vec<bool>, DataStoreError> {
        check_quantity(count, MAX_READ_BITS)?;
        read_sparse(self.bits(bank)?, bank, addr, count)
    }

    /// Write `values` to consecutive bits starting at `addr`.
    pub fn write_bits(
        &mut self,
        bank: Bank,
        addr: u16,
        values: &[bool],
    ) -> Result<(), DataStoreError> {
        let count = quantity_of(values.len(), MAX_WRITE_BITS)?;
        check_quantity(count, MAX_WRITE_BITS)?;
        write_sparse(self.bits_mut(bank)?, bank, addr, values)
    }

    /// Read a 32-bit point stored high word first.
    pub fn read_i32(&self, bank: Bank, addr: u16) -> Result<i32, DataStoreError> {
        let words = self.read_registers(bank, addr, 2)?;
        Ok(merge_i32(words[0], words[1]))
    }

    /// Write a 32-bit point high word first.
    pub fn write_i32(&mut self, bank: Bank, addr: u16, value: i32) -> Result<(), DataStoreError> {
        self.write_registers(bank, addr, &split_i32(value))
    }

    /// Apply a mask write to a holding register and return the new value.
    ///
    /// `result = (current & and_mask) | (or_mask & !and_mask)`
    pub fn mask_write_register(
        &mut self,
        addr: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> Result<u16, DataStoreError> {
        let registers = self.registers_mut(Bank::HoldingRegisters)?;
        let current = registers
            .get_mut(&addr)
            .ok_or(DataStoreError::UnmappedAddress {
                bank: Bank::HoldingRegisters.name(),
                address: addr,
            })?;
        *current = (*current & and_mask) | (or_mask & !and_mask);
        Ok(*current)
    }
}

/// Lock a shared store, mapping poisoning into a store error.
pub fn lock(store: &SharedDataStore) -> Result<MutexGuard<'_, DataStore>, DataStoreError> {
    store.lock().map_err(|_| {
        error!("Data store lock poisoned");
        DataStoreError::Poisoned
    })
}

fn check_quantity(count: u16, max: u16) -> Result<(), DataStoreError> {
    if count == 0 || count > max {
        return Err(DataStoreError::InvalidQuantity { count, max });
    }
    Ok(())
}

fn quantity_of(len: usize, max: u16) -> Result<u16, DataStoreError> {
    u16::try_from(len).map_err(|_| DataStoreError::InvalidQuantity {
        count: u16::MAX,
        max,
    })
}

fn address_at(start: u16, offset: u16, count: u16) -> Result<u16, DataStoreError> {
    start
        .checked_add(offset)
        .ok_or(DataStoreError::AddressOverflow { start, count })
}

fn read_sparse<T: Copy>(
    bank_values: &HashMap<u16, T>,
    bank: Bank,
    addr: u16,
    count: u16,
) -> Result<Vec<T>, DataStoreError> {
    let mut values = Vec::with_capacity(count.into());
    for i in 0..count {
        let reg_addr = address_at(addr, i, count)?;
        match bank_values.get(&reg_addr) {
            Some(v) => values.push(*v),
            None => {
                debug!("Read of unmapped address 0x{:04x} in {}", reg_addr, bank.name());
                return Err(DataStoreError::UnmappedAddress {
                    bank: bank.name(),
                    address: reg_addr,
                });
            }
        }
    }
    Ok(values)
}

fn write_sparse<T: Copy>(
    bank_values: &mut HashMap<u16, T>,
    bank: Bank,
    addr: u16,
    values: &[T],
) -> Result<(), DataStoreError> {
    let count = values.len() as u16;
    // Validate the whole range first so a rejected write leaves the bank untouched
    for i in 0..count {
        let reg_addr = address_at(addr, i, count)?;
        if !bank_values.contains_key(&reg_addr) {
            debug!("Write to unmapped address 0x{:04x} in {}", reg_addr, bank.name());
            return Err(DataStoreError::UnmappedAddress {
                bank: bank.name(),
                address: reg_addr,
            });
        }
    }
    for (i, value) in values.iter().enumerate() {
        bank_values.insert(addr + i as u16, *value);
    }
    debug!(
        "Wrote {} values to {} starting at 0x{:04x}",
        count,
        bank.name(),
        addr
    );
    Ok(())
}
