// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the water level telemetry daemon
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `sensor`: the Modbus TCP level transmitter (address, register, range)
//! - `schedule`: the publish cadence (top-of-hour or fixed interval)
//! - `sheet`: the spreadsheet sink and its OAuth2 client
//!
//! ## Usage
//!
//! ```no_run
//! use hydrolog::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("10.0.0.12".to_string()), // Sensor address
//!     Some(1502),                    // Sensor port
//!     None,                          // Spreadsheet id
//! );
//!
//! println!("Polling sensor at {}", config.sensor.address);
//! ```

pub mod schedule;
pub mod sensor;
pub mod sheet;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

// Re-export all types for public API
pub use schedule::{ScheduleConfig, SchedulePolicyKind};
pub use sensor::SensorConfig;
pub use sheet::SheetConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Root configuration structure for the daemon.
///
/// The configuration is deserialized from and serialized to YAML using the
/// serde framework, and validated against a JSON schema before
/// deserialization to ensure required fields are present and well-typed.
///
/// # Default Values
///
/// Each section uses default values when not explicitly specified in the
/// configuration file, allowing for minimal configuration when custom
/// settings are not required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// The fieldbus level transmitter to poll.
    ///
    /// If not specified in the configuration file, default values are used.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// The publish cadence.
    ///
    /// If not specified, the top-of-hour policy is used.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// The spreadsheet sink and its OAuth2 client.
    ///
    /// If not specified, default values will be used (note that the
    /// spreadsheet id has no usable default).
    #[serde(default)]
    pub sheet: SheetConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        let sample_config = Self::default();
        sample_config
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        // Load and validate with the schema
        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            // We generate a config.sample.yaml file with the default values
            // for the user to edit
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                Self::create_sample_config(path)?;
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        // Perform additional specific validations
        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values that are explicitly provided override the existing
    /// configuration.
    ///
    /// # Parameters
    ///
    /// * `sensor_address` - Optional network address of the sensor
    /// * `sensor_port` - Optional Modbus TCP port of the sensor
    /// * `spreadsheet_id` - Optional destination spreadsheet id
    pub fn apply_args(
        &mut self,
        sensor_address: Option<String>,
        sensor_port: Option<u16>,
        spreadsheet_id: Option<String>,
    ) {
        // Only override if command-line arguments are provided
        if let Some(address) = sensor_address {
            debug!("Overriding sensor address from command line: {}", address);
            self.sensor.address = address;
        }

        if let Some(port) = sensor_port {
            debug!("Overriding sensor port from command line: {}", port);
            self.sensor.port = port;
        }

        if let Some(id) = spreadsheet_id {
            debug!("Overriding spreadsheet id from command line: {}", id);
            self.sheet.spreadsheet_id = id;
        }
    }
}
