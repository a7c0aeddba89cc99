// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! End to end tests: the daemon runs the Modbus server and the simulation
//! loop, a Modbus client plays the supervisory controller.

use std::time::Duration;

use bess_modbus_simulator::config::Config;
use bess_modbus_simulator::daemon::Daemon;
use bess_modbus_simulator::modbus::register_map::*;
use bess_modbus_simulator::simulation::Clock;
use bess_modbus_simulator::utility::{merge_i32, split_i32};
use tokio::time;
use tokio_modbus::prelude::*;

/// Clock frozen inside the charging half of a 60 s period.
struct ChargingClock;

impl Clock for ChargingClock {
    fn unix_seconds(&self) -> u64 {
        1_700_000_010
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.modbus.address = "127.0.0.1".to_string();
    config.modbus.port = 0;
    config.simulation.update_interval_ms = 50;
    config
}

#[tokio::test]
async fn test_setpoints_are_mirrored_over_tcp() -> Result<(), Box<dyn std::error::Error>> {
    let mut daemon = Daemon::new();
    daemon.launch_with_clock(&test_config(), ChargingClock).await?;
    let addr = daemon.modbus_local_addr().ok_or("server not bound")?;

    let mut ctx = tcp::connect(addr).await?;
    ctx.write_multiple_registers(HR_COMMAND, &split_i32(2)).await??;
    ctx.write_multiple_registers(HR_P_SETPOINT, &split_i32(-1500))
        .await??;
    ctx.write_multiple_registers(HR_Q_SETPOINT, &split_i32(300))
        .await??;

    time::sleep(Duration::from_millis(300)).await;

    let state = ctx.read_input_registers(IR_STATE, 2).await??;
    assert_eq!(merge_i32(state[0], state[1]), 2);

    let powers = ctx.read_input_registers(IR_P_MEASURED, 4).await??;
    assert_eq!(merge_i32(powers[0], powers[1]), -1500);
    assert_eq!(merge_i32(powers[2], powers[3]), 300);

    ctx.disconnect().await?;
    daemon.shutdown();
    daemon.join().await?;
    Ok(())
}

#[tokio::test]
async fn test_soc_rises_while_charging() -> Result<(), Box<dyn std::error::Error>> {
    let mut daemon = Daemon::new();
    daemon.launch_with_clock(&test_config(), ChargingClock).await?;
    let addr = daemon.modbus_local_addr().ok_or("server not bound")?;

    time::sleep(Duration::from_millis(300)).await;

    let mut ctx = tcp::connect(addr).await?;
    let soc = ctx.read_input_registers(IR_SOC, 2).await??;
    let soc = merge_i32(soc[0], soc[1]);
    assert!(soc > 5000, "SoC should have increased, got {}", soc);
    assert!(soc <= 9500);

    ctx.disconnect().await?;
    daemon.shutdown();
    daemon.join().await?;
    Ok(())
}

#[tokio::test]
async fn test_disabled_simulation_keeps_registers_constant(
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = test_config();
    config.simulation.enabled = false;

    let mut daemon = Daemon::new();
    daemon.launch_with_clock(&config, ChargingClock).await?;
    let addr = daemon.modbus_local_addr().ok_or("server not bound")?;

    let mut ctx = tcp::connect(addr).await?;
    ctx.write_multiple_registers(HR_P_SETPOINT, &split_i32(1000))
        .await??;
    time::sleep(Duration::from_millis(200)).await;

    let soc = ctx.read_input_registers(IR_SOC, 2).await??;
    assert_eq!(soc, vec![0, 5000]);
    let p = ctx.read_input_registers(IR_P_MEASURED, 2).await??;
    assert_eq!(p, vec![0, 0]);

    ctx.disconnect().await?;
    daemon.shutdown();
    daemon.join().await?;
    Ok(())
}

#[tokio::test]
async fn test_disabled_modbus_does_not_bind() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = test_config();
    config.modbus.enabled = false;

    let mut daemon = Daemon::new();
    daemon.launch_with_clock(&config, ChargingClock).await?;
    assert!(daemon.modbus_local_addr().is_none());
    assert!(daemon.data_store().is_some());

    daemon.shutdown();
    time::timeout(Duration::from_secs(2), daemon.join()).await??;
    Ok(())
}

#[tokio::test]
async fn test_invalid_address_fails_launch() {
    let mut config = test_config();
    config.modbus.address = "not-an-address".to_string();

    let mut daemon = Daemon::new();
    assert!(daemon.launch(&config).await.is_err());
    daemon.shutdown();
}

#[tokio::test]
async fn test_zero_update_interval_fails_launch() {
    let mut config = test_config();
    config.modbus.enabled = false;
    config.simulation.update_interval_ms = 0;

    let mut daemon = Daemon::new();
    assert!(daemon.launch_with_clock(&config, ChargingClock).await.is_err());
    daemon.shutdown();
}
