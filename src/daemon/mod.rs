//! # Daemon Module
//!
//! The daemon module provides functionality for running and managing the
//! background tasks of the telemetry daemon: the acquisition loop and a
//! heartbeat monitor.
//!
//! ## Components
//!
//! * **Launch Daemon**: Core implementation for starting, monitoring, and
//!   gracefully shutting down background tasks
//!
//! ## Usage
//!
//! ```no_run
//! use hydrolog::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     // Create and launch daemon
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config)?;
//!
//!     // Wait for shutdown signal (e.g., Ctrl+C)
//!     tokio::signal::ctrl_c().await?;
//!
//!     // Clean shutdown
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;
