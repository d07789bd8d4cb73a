// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Serial transport layer for bootloader communication.

use std::io::{Read, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;

use ota_common::{LinkError, SerialLink, Timeout};

/// Default wait for the first byte of a response, in milliseconds.
/// Covers the staging-region erase triggered by the first DATA chunk.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Serial port link to the bootloader UART.
pub struct Transport {
    port: Box<dyn SerialPort>,
    response_timeout: Duration,
    current_timeout: Duration,
}

impl Transport {
    /// Open `port_name` at `baud`, 8N1.
    pub fn open(port_name: &str, baud: u32, timeout_ms: u64) -> Result<Self> {
        let response_timeout = Duration::from_millis(timeout_ms);
        let port = serialport::new(port_name, baud)
            .timeout(response_timeout)
            .open()
            .with_context(|| format!("Failed to open serial port {}", port_name))?;

        Ok(Self {
            port,
            response_timeout,
            current_timeout: response_timeout,
        })
    }

    /// Get the port name.
    pub fn port_name(&self) -> String {
        self.port.name().unwrap_or_else(|| "?".to_string())
    }

    /// Discard anything the device sent before the session.
    pub fn drain_rx(&mut self) {
        let mut buf = [0u8; 64];
        let old_timeout = self.port.timeout();
        let _ = self.port.set_timeout(Duration::from_millis(10));
        while self.port.read(&mut buf).unwrap_or(0) > 0 {}
        let _ = self.port.set_timeout(old_timeout);
    }

    fn use_timeout(&mut self, timeout: Duration) -> Result<(), LinkError> {
        if self.current_timeout != timeout {
            self.port.set_timeout(timeout).map_err(|_| LinkError::Io)?;
            self.current_timeout = timeout;
        }
        Ok(())
    }
}

impl SerialLink for Transport {
    fn receive_byte(&mut self, timeout: Timeout) -> Result<u8, LinkError> {
        let wait = match timeout {
            Timeout::Forever => self.response_timeout,
            Timeout::Millis(ms) => Duration::from_millis(u64::from(ms)),
        };
        self.use_timeout(wait)?;

        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(1) => return Ok(byte[0]),
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    return Err(LinkError::Timeout)
                }
                Err(_) => return Err(LinkError::Io),
            }
        }
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.port.write_all(bytes).map_err(|_| LinkError::Io)?;
        self.port.flush().map_err(|_| LinkError::Io)
    }
}
