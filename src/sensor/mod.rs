// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the hydrolog project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fieldbus sensor access
//!
//! This module owns the Modbus TCP connection to the level transmitter and
//! provides the retrying read primitive the acquisition loop is built on.
//!
//! The transmitter exposes its loop current as a single input register
//! (microamps, signed 16 bit). Two failure classes exist and are retried
//! identically: transport errors (socket refused, broken pipe, framing) and
//! protocol errors (the device answers but flags the request as an error).
//!
//! Retry behavior is an injected [`RetryPolicy`]. Production uses an
//! unbounded policy with a fixed 1 s backoff: the sensor network is assumed
//! eventually reachable and the daemon prioritizes liveness over bounded
//! latency. Tests inject a bounded policy to keep failures observable.
//! Every retry loop also honors the shared `running` flag so the daemon
//! never becomes unkillable while a device is offline.

pub mod scale;

pub use scale::{scale_current_to_range, SensorRange};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;
use tokio_modbus::client::{tcp, Context, Reader};
use tokio_modbus::Slave;

/// Fixed backoff between connection and read attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// A failure talking to the fieldbus device.
#[derive(Debug, Error)]
pub enum FieldbusError {
    /// Socket-level failure: connect refused, timeout, broken pipe.
    #[error("fieldbus transport error: {0}")]
    Transport(#[source] tokio_modbus::Error),

    /// The device answered, but flagged the request as an error.
    #[error("fieldbus device exception: {0:?}")]
    Protocol(tokio_modbus::ExceptionCode),

    /// A read was issued before `connect` succeeded.
    #[error("fieldbus connection is not open")]
    NotConnected,
}

/// Why an acquisition primitive gave up.
///
/// Under the production (unbounded) retry policy the only possible exit is
/// [`AcquireError::Cancelled`], raised when the daemon is shutting down.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// The bounded retry budget ran out. Never happens with an
    /// unbounded policy.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: FieldbusError,
    },

    /// The shared running flag was cleared while retrying.
    #[error("acquisition cancelled")]
    Cancelled,
}

/// Retry behavior for connect and read loops.
///
/// `max_attempts: None` retries forever. A fixed backoff is the observed
/// field behavior; a ceiling or growing backoff would be a one-line change
/// here without touching the reader.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Give up after this many attempts, or never when `None`.
    pub max_attempts: Option<u32>,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Retry forever with the given backoff. Production default.
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            max_attempts: None,
            backoff,
        }
    }

    /// Retry at most `max_attempts` times. Used by tests.
    pub fn bounded(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            backoff,
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(RETRY_BACKOFF)
    }
}

/// Low-level fieldbus transport.
///
/// Abstracts the Modbus client so the reader's retry logic can be exercised
/// against a fake transport in tests, mirroring how acquisition sources are
/// substituted elsewhere in the application.
#[async_trait]
pub trait FieldbusClient: Send {
    /// Open (or re-open) the transport connection.
    async fn connect(&mut self) -> Result<(), FieldbusError>;

    /// Read one input register over the already-open connection.
    async fn read_input_register(&mut self, register: u16) -> Result<u16, FieldbusError>;
}

/// Modbus TCP implementation of [`FieldbusClient`].
///
/// Owns the `tokio-modbus` context exclusively; `connect` replaces any
/// previous context, reads reuse the current one.
pub struct ModbusFieldbusClient {
    socket_addr: SocketAddr,
    slave: Slave,
    ctx: Option<Context>,
}

impl ModbusFieldbusClient {
    pub fn new(socket_addr: SocketAddr, unit_id: u8) -> Self {
        Self {
            socket_addr,
            slave: Slave(unit_id),
            ctx: None,
        }
    }
}

#[async_trait]
impl FieldbusClient for ModbusFieldbusClient {
    async fn connect(&mut self) -> Result<(), FieldbusError> {
        // Drop any stale context before dialing again
        self.ctx = None;
        let ctx = tcp::connect_slave(self.socket_addr, self.slave)
            .await
            .map_err(|err| FieldbusError::Transport(err.into()))?;
        debug!("Fieldbus connection open to {}", self.socket_addr);
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn read_input_register(&mut self, register: u16) -> Result<u16, FieldbusError> {
        let ctx = self.ctx.as_mut().ok_or(FieldbusError::NotConnected)?;
        match ctx.read_input_registers(register, 1).await {
            Ok(Ok(words)) => Ok(words[0]),
            Ok(Err(exception)) => Err(FieldbusError::Protocol(exception)),
            Err(err) => Err(FieldbusError::Transport(err.into())),
        }
    }
}

/// Retrying reader for the level transmitter.
///
/// Wraps a [`FieldbusClient`] with the retry policy and cancellation flag.
/// `connect` and `read_raw` block (asynchronously) until they succeed, the
/// bounded policy runs out, or the daemon is cancelled - they never surface
/// a transport or protocol error to the caller.
pub struct SensorReader {
    client: Box<dyn FieldbusClient>,
    register: u16,
    retry: RetryPolicy,
    running: Arc<AtomicBool>,
}

impl SensorReader {
    pub fn new(
        client: Box<dyn FieldbusClient>,
        register: u16,
        retry: RetryPolicy,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            client,
            register,
            retry,
            running,
        }
    }

    /// Open the transport connection, retrying on any failure.
    ///
    /// Connection failures recreate the handle on the next attempt; this is
    /// the only place a new connection is established.
    pub async fn connect(&mut self) -> Result<(), AcquireError> {
        let mut attempts = 0u32;
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Err(AcquireError::Cancelled);
            }
            match self.client.connect().await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    attempts += 1;
                    warn!("Failed to open sensor connection: {}. Trying again.", err);
                    if self.retry.exhausted(attempts) {
                        return Err(AcquireError::RetriesExhausted {
                            attempts,
                            source: err,
                        });
                    }
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }
    }

    /// Read the loop current in microamps, retrying on any failure.
    ///
    /// Retries reuse the open handle - a failed read does NOT reconnect.
    /// The u16 register is reinterpreted as a signed 16-bit microamp value.
    pub async fn read_raw(&mut self) -> Result<i16, AcquireError> {
        let mut attempts = 0u32;
        loop {
            if !self.running.load(Ordering::SeqCst) {
                return Err(AcquireError::Cancelled);
            }
            match self.client.read_input_register(self.register).await {
                Ok(word) => return Ok(word as i16),
                Err(err) => {
                    attempts += 1;
                    warn!("Failed to get sensor reading: {}. Trying again.", err);
                    if self.retry.exhausted(attempts) {
                        return Err(AcquireError::RetriesExhausted {
                            attempts,
                            source: err,
                        });
                    }
                    tokio::time::sleep(self.retry.backoff).await;
                }
            }
        }
    }
}
