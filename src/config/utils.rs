// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::Config;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the
/// configuration to stdout, formatted for readability.
///
/// ### Example
///
/// ```bash
/// ./hydrolog --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    // Load the schema from the embedded string
    let schema_str = include_str!("../../resources/config.schema.json");

    // Parse the schema to a JSON Value to pretty-format it
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
///
/// ### Arguments
///
/// * `addr` - The address string to validate
///
/// ### Returns
///
/// `true` if the address is valid, `false` otherwise
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered
/// by the JSON schema.
///
/// ### Arguments
///
/// * `config` - The configuration object to validate
///
/// ### Returns
///
/// * `Ok(())` if all validations pass
/// * `Err(anyhow::Error)` with descriptive message if any validation fails
///
/// ### Validation Rules
///
/// This function validates:
///
/// - **Sensor address**: must be a valid IP address or special value
/// - **Sensor port**: must be non-zero
/// - **Sensor range**: `low` must be strictly below `high`
/// - **Schedule**: `interval_secs` must be non-zero
/// - **Sheet range**: must be non-empty
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if !is_valid_ip_address(&config.sensor.address) {
        anyhow::bail!("Invalid sensor address: {}", config.sensor.address);
    }

    if config.sensor.port == 0 {
        anyhow::bail!("Sensor port must be between 1 and 65535");
    }

    if config.sensor.range.low >= config.sensor.range.high {
        anyhow::bail!(
            "Sensor range low ({}) must be strictly below high ({})",
            config.sensor.range.low,
            config.sensor.range.high
        );
    }

    if config.schedule.interval_secs == 0 {
        anyhow::bail!("Schedule interval_secs must be greater than zero");
    }

    if config.sheet.range.is_empty() {
        anyhow::bail!("Sheet range must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_ip_address() {
        assert!(is_valid_ip_address("192.168.88.46"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(is_valid_ip_address("0.0.0.0"));
        assert!(!is_valid_ip_address("not-an-address"));
        assert!(!is_valid_ip_address(""));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut config = Config::default();
        config.sensor.range.low = 30.0;
        config.sensor.range.high = 0.0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.schedule.interval_secs = 0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }
}
