// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! One sensor reading, timestamped at acquisition

use chrono::Local;
use serde::Serialize;

/// Timestamp layout used for rows and console output (local wall clock,
/// microsecond precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// A single acquired measurement.
///
/// Created once per schedule tick, immutable, handed to the sink and then
/// discarded - readings are never retained or batched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// ISO-8601 local timestamp taken right after the raw read succeeded.
    pub timestamp: String,
    /// Loop current as read from the device, in microamps.
    pub raw_microamps: i16,
    /// Scaled engineering value (water height in ft for the reference
    /// deployment).
    pub derived_value: f64,
}

impl Reading {
    /// Build a reading stamped with the current local time.
    pub fn now(raw_microamps: i16, derived_value: f64) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            raw_microamps,
            derived_value,
        }
    }

    /// The console line logged once per reading. Format is load-bearing:
    /// operators grep these lines.
    pub fn console_line(&self) -> String {
        let rounded = (self.derived_value * 1000.0).round() / 1000.0;
        format!(
            "[{}] Current reading is: {} [microamps] Water height is: {} [ft]",
            self.timestamp, self.raw_microamps, rounded
        )
    }
}
