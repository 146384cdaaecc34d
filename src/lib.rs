// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # hydrolog
//!
//! Unattended water level telemetry daemon. Polls a single 4-20 mA
//! current-loop sensor over Modbus TCP, scales the raw microamp reading to
//! an engineering unit, and appends each reading as one row to a Google
//! Sheets spreadsheet on a fixed schedule.
//!
//! ## Architecture
//!
//! The pipeline is composed of small, separately testable parts:
//!
//! * [`sensor`] - the retrying Modbus reader and the 4-20 mA unit scaler
//! * [`schedule`] - top-of-hour (or fixed-interval) wake-time computation
//!   and the coarse sleep-poll gate
//! * [`sheets`] - the Sheets `values:append` publisher and the OAuth2
//!   credential provider
//! * [`acquisition`] - the loop tying gate, reader, scaler and publisher
//!   together, one reading per schedule tick
//! * [`daemon`] - background task lifecycle (launch, heartbeat, shutdown)
//! * [`config`] - YAML configuration with schema validation
//!
//! The daemon is designed for liveness: sensor connect and read failures are
//! retried indefinitely with a fixed backoff, while publish failures are
//! logged and the affected reading dropped so the next tick proceeds on time.

pub mod acquisition;
pub mod config;
pub mod daemon;
pub mod schedule;
pub mod sensor;
pub mod sheets;
