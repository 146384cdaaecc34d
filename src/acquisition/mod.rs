// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Acquisition loop
//!
//! Ties the schedule gate, the sensor reader, the unit scaler and the sink
//! together: wait for the boundary, read one raw value, scale it, log the
//! console line, publish the row. One reading and exactly one publish
//! attempt per tick.
//!
//! The loop is the last line of defense: no component failure terminates
//! it. Reader failures are absorbed below it (retry), publish failures are
//! logged here and the affected reading dropped - the next tick proceeds
//! normally. The loop exits only when the shared running flag clears.

pub mod reading;

pub use reading::{Reading, TIMESTAMP_FORMAT};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use log::{error, info};

use crate::schedule::{self, SchedulePolicy};
use crate::sensor::{scale_current_to_range, AcquireError, SensorRange, SensorReader};
use crate::sheets::ReadingSink;

/// The forever-running acquisition pipeline.
///
/// On startup it connects to the sensor and performs one immediate
/// unscheduled read/publish (the warm read), then enters the steady
/// wait-read-scale-publish cycle. Cycles never overlap: tick N completes
/// or definitively fails before the gate for tick N+1 is armed.
pub struct AcquisitionDaemon {
    reader: SensorReader,
    sink: Box<dyn ReadingSink>,
    policy: SchedulePolicy,
    range: SensorRange,
    running: Arc<AtomicBool>,
    cycles: Arc<AtomicU64>,
}

impl AcquisitionDaemon {
    pub fn new(
        reader: SensorReader,
        sink: Box<dyn ReadingSink>,
        policy: SchedulePolicy,
        range: SensorRange,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader,
            sink,
            policy,
            range,
            running,
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Completed publish cycles (warm read included). Shared with the
    /// daemon heartbeat and with tests.
    pub fn cycle_counter(&self) -> Arc<AtomicU64> {
        self.cycles.clone()
    }

    /// Run until cancelled.
    ///
    /// Only a bounded retry policy (tests) can make this return an error;
    /// under the production policy the sole exit is cancellation, which
    /// returns `Ok`.
    pub async fn run(&mut self) -> Result<()> {
        match self.reader.connect().await {
            Ok(()) => {}
            Err(AcquireError::Cancelled) => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        // Warm read: one immediate reading before the first boundary
        if !self.acquire_and_publish().await {
            info!("Acquisition loop stopped");
            return Ok(());
        }

        while self.running.load(Ordering::SeqCst) {
            let target = schedule::next_boundary(&self.policy, Local::now().naive_local());
            info!(
                "Waiting for time: {} to publish data.",
                target.format("%Y-%m-%dT%H:%M:%S")
            );
            if !schedule::wait_until(target, &self.running).await {
                break;
            }
            if !self.acquire_and_publish().await {
                break;
            }
        }

        info!("Acquisition loop stopped");
        Ok(())
    }

    /// One full tick: read, scale, log, publish. Returns `false` when the
    /// daemon was cancelled mid-tick.
    async fn acquire_and_publish(&mut self) -> bool {
        let raw = match self.reader.read_raw().await {
            Ok(raw) => raw,
            Err(AcquireError::Cancelled) => return false,
            Err(err) => {
                // Only reachable with a bounded retry policy
                error!("Sensor read gave up: {}", err);
                self.cycles.fetch_add(1, Ordering::SeqCst);
                return true;
            }
        };

        let value = scale_current_to_range(raw, &self.range);
        let reading = Reading::now(raw, value);
        info!("{}", reading.console_line());

        match self.sink.publish(&reading).await {
            Ok(ack) => {
                if ack.updates.updated_rows == 0 {
                    error!("Sink acknowledged the append but reported no rows written");
                }
            }
            Err(err) => {
                // Reading is dropped, next tick proceeds on schedule
                error!("Failed to publish reading: {}", err);
            }
        }

        self.cycles.fetch_add(1, Ordering::SeqCst);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::{FieldbusClient, FieldbusError, RetryPolicy};
    use crate::sheets::{AppendResponse, AppendUpdates, PublishError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    struct FixedClient {
        value: u16,
    }

    #[async_trait]
    impl FieldbusClient for FixedClient {
        async fn connect(&mut self) -> Result<(), FieldbusError> {
            Ok(())
        }

        async fn read_input_register(&mut self, _register: u16) -> Result<u16, FieldbusError> {
            Ok(self.value)
        }
    }

    struct RecordingSink {
        rows: Mutex<Vec<Reading>>,
    }

    #[async_trait]
    impl ReadingSink for Arc<RecordingSink> {
        async fn publish(&self, reading: &Reading) -> Result<AppendResponse, PublishError> {
            self.rows.lock().unwrap().push(reading.clone());
            Ok(AppendResponse {
                updates: AppendUpdates {
                    updated_rows: 1,
                    ..AppendUpdates::default()
                },
                ..AppendResponse::default()
            })
        }
    }

    #[tokio::test]
    async fn test_bootstrap_performs_warm_read_before_first_boundary() {
        let running = Arc::new(AtomicBool::new(true));
        let reader = SensorReader::new(
            Box::new(FixedClient { value: 16_000 }),
            40002,
            RetryPolicy::default(),
            running.clone(),
        );
        let sink = Arc::new(RecordingSink {
            rows: Mutex::new(Vec::new()),
        });

        let mut daemon = AcquisitionDaemon::new(
            reader,
            Box::new(sink.clone()),
            // First boundary is an hour away: only the warm read fires
            SchedulePolicy::FixedInterval(Duration::from_secs(3600)),
            SensorRange::default(),
            running.clone(),
        );
        let cycles = daemon.cycle_counter();

        let handle = tokio::spawn(async move { daemon.run().await });
        sleep(Duration::from_millis(200)).await;

        assert_eq!(cycles.load(Ordering::SeqCst), 1);
        let rows = sink.rows.lock().unwrap().clone();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].raw_microamps, 16_000);
        assert_eq!(rows[0].derived_value, 22.5);

        running.store(false, Ordering::SeqCst);
        handle.await.unwrap().unwrap();
    }
}
