//! # Daemon Management Module
//!
//! This module provides functionality for running and managing the
//! background tasks of the telemetry daemon:
//!
//! - The acquisition loop (sensor polling and publishing)
//! - System health monitoring (heartbeat)
//!
//! The daemon system allows for graceful startup and shutdown of these
//! services, with proper error handling and task coordination.
//!
//! ## Architecture
//!
//! The daemon system uses Tokio's asynchronous runtime to manage concurrent
//! tasks. Each service runs as an independent task, and the main daemon
//! structure tracks and coordinates these tasks through a shared running
//! flag.

use anyhow::{Context, Result};
use log::{debug, info};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::acquisition::AcquisitionDaemon;
use crate::config::Config;
use crate::sensor::{ModbusFieldbusClient, RetryPolicy, SensorReader};
use crate::sheets::{OauthTokenProvider, SheetsPublisher};

/// Represents a daemon task manager that coordinates the background services
///
/// This structure maintains a collection of asynchronous tasks and provides
/// methods to start, stop, and monitor them.
///
/// # Thread Safety
///
/// The `running` flag is wrapped in an `Arc` to allow safe sharing between
/// tasks. Each task checks this flag periodically to determine if it should
/// continue running or gracefully terminate; the sensor retry loops check it
/// too, so a daemon stuck waiting for an unreachable device still shuts
/// down.
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    cycles: Arc<AtomicU64>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    ///
    /// Initializes a new daemon manager with an empty task list and the
    /// running flag set to `true`.
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            cycles: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The shared running flag, for callers that integrate their own
    /// cancellation signal.
    pub fn running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Launch all configured tasks based on configuration
    ///
    /// Starts the acquisition loop and the heartbeat monitor. The sensor
    /// address must parse into a socket address; this is the last
    /// configuration check before the daemon goes unattended, and it is
    /// fatal.
    ///
    /// # Errors
    ///
    /// Fails if the configured sensor address/port do not form a valid
    /// socket address.
    pub fn launch(&mut self, config: &Config) -> Result<()> {
        self.start_acquisition(config)?;
        self.start_heartbeat()?;
        Ok(())
    }

    /// Start the acquisition loop task
    ///
    /// Wires the concrete pipeline: Modbus client → retrying reader →
    /// scaler → Sheets publisher with the OAuth2 token provider, under the
    /// configured schedule policy.
    fn start_acquisition(&mut self, config: &Config) -> Result<()> {
        info!(
            "Starting acquisition of sensor {}:{} (register {}, unit {})",
            config.sensor.address, config.sensor.port, config.sensor.register, config.sensor.unit_id
        );

        let socket_addr: SocketAddr =
            format!("{}:{}", config.sensor.address, config.sensor.port)
                .parse()
                .with_context(|| {
                    format!(
                        "Invalid sensor socket address {}:{}",
                        config.sensor.address, config.sensor.port
                    )
                })?;

        let client = ModbusFieldbusClient::new(socket_addr, config.sensor.unit_id);
        let reader = SensorReader::new(
            Box::new(client),
            config.sensor.register,
            RetryPolicy::default(),
            self.running.clone(),
        );

        let tokens = OauthTokenProvider::new(&config.sheet);
        let publisher = SheetsPublisher::new(&config.sheet, Box::new(tokens));

        let mut acquisition = AcquisitionDaemon::new(
            reader,
            Box::new(publisher),
            config.schedule.policy(),
            config.sensor.range,
            self.running.clone(),
        );
        self.cycles = acquisition.cycle_counter();

        let task = tokio::spawn(async move { acquisition.run().await });
        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    ///
    /// The heartbeat task runs every 60 seconds and continues until the
    /// daemon's `running` flag is set to `false`. In a production
    /// environment these messages can be monitored by an external system to
    /// detect if the daemon has stopped functioning properly.
    fn start_heartbeat(&mut self) -> Result<()> {
        info!("Starting heartbeat monitor");

        let running = self.running.clone();
        let cycles = self.cycles.clone();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!(
                    "Daemon heartbeat: running, {} publish cycles completed",
                    cycles.load(Ordering::SeqCst)
                );
                time::sleep(Duration::from_secs(60)).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Stop all running tasks gracefully
    ///
    /// Signals all spawned tasks to terminate by setting the shared
    /// `running` flag to `false`. This method only signals the tasks to
    /// stop; it does not wait for them to complete. To wait for all tasks
    /// to finish, call `join()` after this method.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        // Tasks should check the running flag and terminate gracefully
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon and waits for all spawned tasks to finish
    /// execution. This method should be called after `shutdown()` to ensure
    /// a clean application exit.
    ///
    /// If any task panics, the error is logged but this method will still
    /// wait for all other tasks to complete.
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match tokio::time::timeout(Duration::from_secs(5), task).await {
                Ok(result) => {
                    if let Err(e) = result {
                        log::error!("Task panicked: {}", e);
                    }
                }
                Err(_) => {
                    // Task didn't complete within timeout
                    log::warn!("Task did not complete within timeout period, may be hung");
                }
            }
        }
        Ok(())
    }
}
