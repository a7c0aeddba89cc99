// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Time source used by the simulation

#[cfg(test)]
use mockall::automock;

/// Wall clock abstraction so the charge/discharge phase can be driven in tests.
#[cfg_attr(test, automock)]
pub trait Clock: Send + Sync {
    /// Seconds elapsed since the UNIX epoch.
    fn unix_seconds(&self) -> u64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}
