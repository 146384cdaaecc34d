// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Publish schedule configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::schedule::SchedulePolicy;

/// Which cadence the acquisition loop runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePolicyKind {
    /// Publish at the top of every hour, wall-clock aligned.
    AlignedHourly,
    /// Publish every `interval_secs`, unaligned.
    FixedInterval,
}

/// Configuration for the publish schedule.
///
/// # Fields
///
/// * `policy` - `aligned_hourly` or `fixed_interval`
/// * `interval_secs` - Period for the `fixed_interval` policy, in seconds
///   (ignored by `aligned_hourly`; default: 300)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// The cadence policy.
    pub policy: SchedulePolicyKind,

    /// Seconds between publishes under `fixed_interval`.
    ///
    /// Must be greater than zero.
    pub interval_secs: u64,
}

impl ScheduleConfig {
    /// Resolve the configured policy into the runtime value.
    pub fn policy(&self) -> SchedulePolicy {
        match self.policy {
            SchedulePolicyKind::AlignedHourly => SchedulePolicy::AlignedHourly,
            SchedulePolicyKind::FixedInterval => {
                SchedulePolicy::FixedInterval(Duration::from_secs(self.interval_secs))
            }
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            policy: SchedulePolicyKind::AlignedHourly,
            interval_secs: 300, // 5 minutes, the observed alternate cadence
        }
    }
}
