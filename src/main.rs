// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the water level telemetry daemon

use anyhow::Result;
use clap::Parser;
use log::info;

use std::path::PathBuf;

use tokio::signal;

use hydrolog::config::{self, Config};
use hydrolog::daemon::launch_daemon::Daemon;

/// Water level telemetry daemon: Modbus TCP sensor to Google Sheets
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

    /// Sensor network address
    #[arg(long)]
    sensor_address: Option<String>,

    /// Sensor Modbus TCP port
    #[arg(long)]
    sensor_port: Option<u16>,

    /// Destination spreadsheet id
    #[arg(long)]
    spreadsheet_id: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger with appropriate level based on verbose and quiet flags
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // Check if --show-config-schema flag is set
    if args.show_config_schema {
        return config::output_config_schema();
    }

    // Validate configuration file if --validate-config is set
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

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    // Apply command line overrides
    config.apply_args(
        args.sensor_address.clone(),
        args.sensor_port,
        args.spreadsheet_id.clone(),
    );

    info!("Starting in daemon mode");
    let mut daemon = Daemon::new();
    daemon.launch(&config)?;

    // Wait for termination signal
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
            daemon.shutdown();
            daemon.join().await?;
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }

    Ok(())
}
