// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Error kinds for every layer of the update engine.
//!
//! Each layer has its own small `Copy` enum; [`OtaError`] wraps them so `?`
//! composes across the transport, protocol, flash and configuration layers.

use core::fmt;

use crate::protocol::Command;

/// Failure reported by the byte-level serial collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// No byte arrived before the deadline.
    Timeout,
    /// The peripheral reported a receive or transmit fault.
    Io,
}

/// A frame could not be received intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Start or end marker did not match.
    Framing,
    /// The link stalled in the middle of a frame.
    Timeout,
    /// Declared payload length exceeds the receive buffer.
    Overflow { declared: u16 },
    /// Trailing CRC does not match the computed one.
    Integrity { received: u16, computed: u16 },
    /// The serial peripheral failed.
    Link,
}

/// A well-formed frame was not acceptable in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtocolError {
    UnknownCommand(u8),
    UnexpectedCommand { expected: Command, received: Command },
    /// Payload length does not fit the command.
    MalformedPayload,
    /// Header announces an unknown firmware kind or an impossible size.
    InvalidHeader,
    NoSlotAvailable,
    EmptyChunk,
    /// The chunk would take the image past its announced size.
    ChunkOverrun { received: u32, chunk: u16, total: u32 },
    /// A chunk that does not finish the image must be a whole number of program units.
    UnalignedChunk { chunk: u16 },
    ImageCrcMismatch { expected: u16, computed: u16 },
    /// The host cancelled the session.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    Unlock,
    Lock,
    /// Erase or program attempted outside an unlock/lock bracket.
    Locked,
    Erase { address: u32 },
    Program { address: u32 },
    Read { address: u32 },
    /// Access falls outside the target region.
    OutOfBounds { address: u32, len: u32 },
    /// Program address not aligned to a program unit.
    Misaligned { address: u32 },
}

/// The persisted configuration record is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    Truncated { needed: usize, available: usize },
    UnknownRebootCause(u32),
    CorruptFlag { slot: u8, offset: u8, value: u8 },
    TooManySlots(u8),
    InvalidSlot(u8),
    /// The record does not fit in the configuration sector.
    DoesNotFit { size: u32, capacity: u32 },
}

/// Any failure of an update session step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OtaError {
    Transport(TransportError),
    Protocol(ProtocolError),
    Flash(FlashError),
    Config(ConfigError),
}

impl From<LinkError> for TransportError {
    fn from(e: LinkError) -> Self {
        match e {
            LinkError::Timeout => Self::Timeout,
            LinkError::Io => Self::Link,
        }
    }
}

impl From<LinkError> for OtaError {
    fn from(e: LinkError) -> Self {
        Self::Transport(e.into())
    }
}

impl From<TransportError> for OtaError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ProtocolError> for OtaError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<FlashError> for OtaError {
    fn from(e: FlashError) -> Self {
        Self::Flash(e)
    }
}

impl From<ConfigError> for OtaError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "serial receive timed out"),
            Self::Io => write!(f, "serial peripheral error"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framing => write!(f, "bad frame marker"),
            Self::Timeout => write!(f, "link stalled mid-frame"),
            Self::Overflow { declared } => {
                write!(f, "declared payload length {} exceeds buffer", declared)
            }
            Self::Integrity { received, computed } => write!(
                f,
                "frame CRC mismatch (received 0x{:04x}, computed 0x{:04x})",
                received, computed
            ),
            Self::Link => write!(f, "serial link error"),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand(cmd) => write!(f, "unknown command 0x{:02x}", cmd),
            Self::UnexpectedCommand { expected, received } => {
                write!(f, "expected {:?}, received {:?}", expected, received)
            }
            Self::MalformedPayload => write!(f, "malformed payload"),
            Self::InvalidHeader => write!(f, "invalid image header"),
            Self::NoSlotAvailable => write!(f, "no slot available"),
            Self::EmptyChunk => write!(f, "empty data chunk"),
            Self::ChunkOverrun {
                received,
                chunk,
                total,
            } => write!(
                f,
                "chunk of {} bytes overruns image ({} of {} received)",
                chunk, received, total
            ),
            Self::UnalignedChunk { chunk } => {
                write!(f, "non-final chunk of {} bytes is not unit aligned", chunk)
            }
            Self::ImageCrcMismatch { expected, computed } => write!(
                f,
                "image CRC mismatch (expected 0x{:04x}, computed 0x{:04x})",
                expected, computed
            ),
            Self::Aborted => write!(f, "session aborted by host"),
        }
    }
}

impl fmt::Display for FlashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlock => write!(f, "flash unlock failed"),
            Self::Lock => write!(f, "flash lock failed"),
            Self::Locked => write!(f, "flash is locked"),
            Self::Erase { address } => write!(f, "erase failed at 0x{:08x}", address),
            Self::Program { address } => write!(f, "program failed at 0x{:08x}", address),
            Self::Read { address } => write!(f, "read failed at 0x{:08x}", address),
            Self::OutOfBounds { address, len } => {
                write!(f, "{} bytes at 0x{:08x} outside region", len, address)
            }
            Self::Misaligned { address } => write!(f, "misaligned program at 0x{:08x}", address),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => write!(
                f,
                "config record truncated ({} of {} bytes)",
                available, needed
            ),
            Self::UnknownRebootCause(word) => write!(f, "unknown reboot cause 0x{:08x}", word),
            Self::CorruptFlag {
                slot,
                offset,
                value,
            } => write!(
                f,
                "slot {} flag at offset {} holds 0x{:02x}",
                slot, offset, value
            ),
            Self::TooManySlots(n) => write!(f, "{} slots exceed the slot table", n),
            Self::InvalidSlot(slot) => write!(f, "slot {} does not exist", slot),
            Self::DoesNotFit { size, capacity } => write!(
                f,
                "config record of {} bytes does not fit {} byte sector",
                size, capacity
            ),
        }
    }
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {}", e),
            Self::Protocol(e) => write!(f, "protocol: {}", e),
            Self::Flash(e) => write!(f, "flash: {}", e),
            Self::Config(e) => write!(f, "config: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LinkError {}
#[cfg(feature = "std")]
impl std::error::Error for TransportError {}
#[cfg(feature = "std")]
impl std::error::Error for ProtocolError {}
#[cfg(feature = "std")]
impl std::error::Error for FlashError {}
#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for OtaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::Flash(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}
