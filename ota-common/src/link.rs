// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Byte-level serial collaborator.

use crate::error::LinkError;

/// How long a single receive may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timeout {
    /// Block until a byte arrives (link idle between frames).
    Forever,
    Millis(u32),
}

/// Abstract serial link interface.
///
/// Implemented by the UART shim on the device and by the serial-port
/// wrapper on the host; tests use [`crate::mock::MockLink`].
pub trait SerialLink {
    /// Receive exactly one byte, or fail with [`LinkError::Timeout`].
    fn receive_byte(&mut self, timeout: Timeout) -> Result<u8, LinkError>;

    /// Transmit all bytes.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}
