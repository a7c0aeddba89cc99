// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the bess-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the BESS Modbus simulator
use anyhow::Result;
use bess_modbus_simulator::{config, config::Config, daemon::Daemon, modbus::register_map};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use tokio::signal;

/// Battery Energy Storage System simulator served over Modbus TCP
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Modbus server address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Modbus server port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Delay between two simulation steps in milliseconds
    #[arg(long)]
    update_interval_ms: Option<u64>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.modbus_address.clone(),
        args.modbus_port,
        args.update_interval_ms,
    )?;

    log_banner(&config);

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;
    info!("Simulator ready (Ctrl+C to stop)");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
        }
        Err(err) => {
            error!("Error waiting for shutdown signal: {}", err);
        }
    }

    daemon.shutdown();
    daemon.join().await?;
    info!("Simulator stopped");

    Ok(())
}

/// Log what the simulator serves and where.
fn log_banner(config: &Config) {
    info!("BESS Modbus simulator v{}", env!("CARGO_PKG_VERSION"));
    info!("Address: {}", config.modbus.socket_address());
    info!(
        "Device: {} / {} ({})",
        config.identity.vendor_name, config.identity.product_name, config.identity.model_name
    );
    for line in register_map::describe().lines() {
        info!("{}", line);
    }
    info!(
        "State of charge: start {:.2}%, range {:.2}%..{:.2}%, step every {} ms",
        config.simulation.initial_soc as f32 / 100.0,
        config.simulation.soc_min as f32 / 100.0,
        config.simulation.soc_max as f32 / 100.0,
        config.simulation.update_interval_ms
    );
}
