// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sensor configuration
//!
//! This module defines the structure for configuring the fieldbus level
//! transmitter the daemon polls.

use serde::{Deserialize, Serialize};

use crate::sensor::SensorRange;

/// Configuration for the Modbus TCP level transmitter.
///
/// # Fields
///
/// * `address` - Network address of the sensor (default: 192.168.88.46)
/// * `port` - Modbus TCP port (default: 502)
/// * `unit_id` - Modbus unit (slave) identifier (default: 1)
/// * `register` - Input register holding the loop current in microamps
///   (default: 40002)
/// * `range` - Engineering range spanned by the 4-20 mA loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// The network address of the level transmitter.
    ///
    /// An IPv4/IPv6 address or a resolvable hostname.
    pub address: String,

    /// The TCP port the transmitter's Modbus server listens on.
    ///
    /// Default is 502, the standard Modbus TCP port.
    pub port: u16,

    /// Modbus unit identifier addressed by every request.
    pub unit_id: u8,

    /// Input register holding the raw loop current, in microamps.
    pub register: u16,

    /// What the 4-20 mA span maps to, in engineering units.
    pub range: SensorRange,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            address: "192.168.88.46".to_string(), // Observed transmitter address
            port: 502,                            // Standard Modbus TCP port
            unit_id: 1,
            register: 40002,
            range: SensorRange::default(),
        }
    }
}
