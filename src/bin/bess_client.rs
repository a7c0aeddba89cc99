// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use bess_modbus_simulator::{
    modbus::register_map::{self, Bank},
    utility::{merge_i32, split_i32},
};
use clap::Parser;
use log::{debug, info};
use tokio::time::timeout;
use tokio_modbus::prelude::*;

/// Modbus client driving the BESS simulator
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Modbus server address
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[arg(long, default_value_t = 5502)]
    port: u16,

    /// Unit id put in requests
    #[arg(long, default_value_t = 1)]
    unit_id: u8,

    /// Watchdog value to write before reading
    #[arg(long)]
    watchdog: Option<i32>,

    /// System command to write before reading
    #[arg(long)]
    command: Option<i32>,

    /// Active power setpoint (kW) to write before reading
    #[arg(long, allow_hyphen_values = true)]
    p: Option<i32>,

    /// Reactive power setpoint (kVar) to write before reading
    #[arg(long, allow_hyphen_values = true)]
    q: Option<i32>,

    /// Only read this point (e.g. `soc`, `p_measured`)
    #[arg(long)]
    point: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();
    let request_timeout = Duration::from_millis(args.timeout_ms);

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port)
        .parse()
        .context("Invalid server address")?;
    info!("Connecting to Modbus server at {}", socket_addr);

    let mut ctx = timeout(
        request_timeout,
        tcp::connect_slave(socket_addr, Slave(args.unit_id)),
    )
    .await
    .context("Connection timed out")??;

    let writes = [
        (register_map::HR_WATCHDOG, args.watchdog),
        (register_map::HR_COMMAND, args.command),
        (register_map::HR_P_SETPOINT, args.p),
        (register_map::HR_Q_SETPOINT, args.q),
    ];
    for (addr, value) in writes {
        let Some(value) = value else { continue };
        info!("Writing {} to 0x{:04x}", value, addr);
        timeout(
            request_timeout,
            ctx.write_multiple_registers(addr, &split_i32(value)),
        )
        .await
        .context("Write timed out")???;
    }

    let points = match &args.point {
        Some(name) => {
            let point = register_map::point_by_name(name)
                .ok_or_else(|| anyhow::anyhow!("Unknown point: {}", name))?;
            std::slice::from_ref(point)
        }
        None => register_map::all_points(),
    };

    for point in points {
        let words = match point.bank {
            Bank::HoldingRegisters => {
                timeout(request_timeout, ctx.read_holding_registers(point.address, 2))
                    .await
                    .context("Read timed out")???
            }
            _ => {
                timeout(request_timeout, ctx.read_input_registers(point.address, 2))
                    .await
                    .context("Read timed out")???
            }
        };
        debug!("Raw words at 0x{:04x}: {:?}", point.address, words);
        let value = merge_i32(words[0], words[1]);
        if point.address == register_map::IR_SOC {
            println!(
                "0x{:04x} {:<14} = {} ({:.2} %)",
                point.address,
                point.name,
                value,
                value as f32 / 100.0
            );
        } else {
            println!("0x{:04x} {:<14} = {}", point.address, point.name, value);
        }
    }

    ctx.disconnect().await?;
    Ok(())
}
