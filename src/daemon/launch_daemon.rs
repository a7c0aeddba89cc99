// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module runs the background tasks of the simulator:
//!
//! - Modbus TCP server
//! - Battery simulation loop
//! - System health monitoring (heartbeat)
//!
//! The daemon system allows for graceful startup and shutdown of these services,
//! with proper error handling and task coordination.
//!
//! ## Usage
//!
//! ```no_run
//! use bess_modbus_simulator::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_modbus::server::tcp::{accept_tcp_connection, Server};

use crate::config::Config;
use crate::modbus::{BessModbusServer, DataStore, SharedDataStore};
use crate::simulation::{BessSimulator, Clock, SystemClock};

/// How often long sleeping tasks look at the running flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Interval between two heartbeat log lines.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Represents a daemon task manager that coordinates multiple background services
///
/// # Fields
///
/// * `tasks` - Collection of handles to running tasks for management and cleanup
/// * `running` - Atomic flag shared between tasks to coordinate shutdown
/// * `store` - Register banks shared by the Modbus server and the simulator
/// * `modbus_addr` - Address actually bound by the Modbus listener
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    store: Option<SharedDataStore>,
    modbus_addr: Option<SocketAddr>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// ```
    /// use bess_modbus_simulator::daemon::launch_daemon::Daemon;
    ///
    /// let daemon = Daemon::new();
    /// assert!(daemon.modbus_local_addr().is_none());
    /// ```
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            store: None,
            modbus_addr: None,
        }
    }

    /// Launch all configured tasks based on configuration
    ///
    /// The Modbus listener is bound before this method returns, so clients may
    /// connect as soon as it succeeds.
    ///
    /// # Errors
    ///
    /// Fails when the Modbus address cannot be parsed or bound.
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        self.launch_with_clock(config, SystemClock).await
    }

    /// Same as [`Daemon::launch`] with a custom time source for the simulation.
    pub async fn launch_with_clock<C: Clock + 'static>(
        &mut self,
        config: &Config,
        clock: C,
    ) -> Result<()> {
        let store = DataStore::new(config.simulation.initial_soc).into_shared();
        self.store = Some(store.clone());

        if config.modbus.enabled {
            self.start_modbus_server(config, store.clone()).await?;
        } else {
            warn!("Modbus server disabled in configuration");
        }

        if config.simulation.enabled {
            self.start_simulation(config, store, clock)?;
        } else {
            info!("Simulation disabled, input registers will stay constant");
        }

        self.start_heartbeat()?;

        Ok(())
    }

    /// Address bound by the Modbus server, once launched.
    pub fn modbus_local_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    /// Register banks shared by the server and the simulator, once launched.
    pub fn data_store(&self) -> Option<&SharedDataStore> {
        self.store.as_ref()
    }

    /// Launch the Modbus server
    ///
    /// Every client connection gets its own `BessModbusServer`, all of them
    /// sharing the same data store.
    async fn start_modbus_server(&mut self, config: &Config, store: SharedDataStore) -> Result<()> {
        let bind_addr = config.modbus.socket_address();
        info!("Starting Modbus server on {}", bind_addr);

        let socket_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("Invalid Modbus socket address: {}", bind_addr))?;
        let listener = TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("Failed to bind Modbus server to {}", socket_addr))?;
        let local_addr = listener.local_addr()?;
        self.modbus_addr = Some(local_addr);

        let service = BessModbusServer::new(store, &config.identity, config.modbus.unit_id);
        let running = self.running.clone();

        let task = tokio::spawn(async move {
            let server = Server::new(listener);

            let on_connected = move |stream, socket_addr: SocketAddr| {
                let service = service.clone();
                async move {
                    info!("Modbus client connected from {}", socket_addr);
                    accept_tcp_connection(stream, socket_addr, move |_socket_addr| {
                        Ok(Some(service.clone()))
                    })
                }
            };

            let on_process_error = |err| {
                error!("Modbus server error: {err}");
            };

            let server_handle = tokio::spawn(async move {
                if let Err(e) = server.serve(&on_connected, on_process_error).await {
                    error!("Modbus server error: {}", e);
                }
            });

            while running.load(Ordering::SeqCst) {
                time::sleep(SHUTDOWN_POLL).await;
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();

            match time::timeout(Duration::from_secs(5), server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => warn!("Modbus server shutdown timed out, forcing termination"),
            }

            Ok(())
        });

        self.tasks.push(task);
        info!("Modbus server listening on {}", local_addr);
        Ok(())
    }

    /// Launch the battery simulation loop
    fn start_simulation<C: Clock + 'static>(
        &mut self,
        config: &Config,
        store: SharedDataStore,
        clock: C,
    ) -> Result<()> {
        info!(
            "Starting battery simulation, one step every {} ms",
            config.simulation.update_interval_ms
        );

        let period = config.simulation.update_interval();
        if period.is_zero() {
            anyhow::bail!("Simulation update interval must be greater than zero");
        }
        let mut simulator = BessSimulator::new(store, config.simulation.clone(), clock);
        let running = self.running.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = simulator.step() {
                            error!("Simulation step failed: {}", e);
                        }
                    }
                    _ = time::sleep(SHUTDOWN_POLL) => {}
                }
            }

            info!("Battery simulation stopped");
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let task = tokio::spawn(async move {
            let mut last_beat = Instant::now();
            while running.load(Ordering::SeqCst) {
                if last_beat.elapsed() >= HEARTBEAT_INTERVAL {
                    debug!("Daemon heartbeat: running");
                    last_beat = Instant::now();
                }
                time::sleep(SHUTDOWN_POLL).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Stop all running tasks
    ///
    /// Tasks check the running flag and terminate gracefully.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
    }

    /// Wait for all tasks to complete
    ///
    /// Task panics and errors are logged but do not make this method fail.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}
