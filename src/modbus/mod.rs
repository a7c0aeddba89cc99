// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the Modbus TCP server of the BESS simulator, allowing a
//! supervisory controller to send commands and read back the battery state.
//!
//! ## Key Components
//!
//! - `BessModbusServer`: the request handler plugged into the tokio-modbus TCP server
//! - `DataStore`: sparse register banks shared by all connections and the simulator
//! - `register_map`: addresses and descriptions of every point
//! - `device_identification`: encoding of the Read Device Identification function
//!
//! ## Usage
//!
//! The Modbus server is started as part of the application daemon:
//!
//! ```no_run
//! use bess_modbus_simulator::config::Config;
//! use bess_modbus_simulator::daemon::launch_daemon::Daemon;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! let mut daemon = Daemon::new();
//! daemon.launch(&config).await?;
//! # Ok(())
//! # }
//! ```

pub mod datastore;
pub mod device_identification;
pub mod modbus_server;
pub mod register_map;

pub use datastore::{DataStore, DataStoreError, SharedDataStore};
pub use modbus_server::BessModbusServer;
