// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared protocol constants and message types for bootloader <-> host communication.
//!
//! All multi-byte wire fields are little-endian.

use crate::error::ProtocolError;

// --- Framing constants ---

/// Start-of-frame marker.
pub const SOF: u8 = 0x2A;
/// End-of-frame marker.
pub const EOF: u8 = 0x23;

/// Response status: step accepted.
pub const ACK: u8 = 0x00;
/// Response status: step rejected, session terminated.
pub const NACK: u8 = 0x01;

/// Maximum payload carried by a single frame.
pub const MAX_PAYLOAD_SIZE: usize = 128;
/// SOF(1) + CMD(1) + LEN(2) + CRC(2) + EOF(1).
pub const FRAME_OVERHEAD: usize = 7;
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + FRAME_OVERHEAD;

/// Per-byte receive timeout once a frame has started.
pub const DEFAULT_BYTE_TIMEOUT_MS: u32 = 250;

/// Flash is programmed in aligned units of this many bytes.
pub const PROGRAM_UNIT: usize = 8;

/// Maximum number of entries in the persisted slot table.
pub const MAX_SLOTS: usize = 4;

// --- Commands ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Start = 1,
    Header = 2,
    FwData = 3,
    End = 4,
    Abort = 5,
}

impl Command {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Start),
            2 => Ok(Self::Header),
            3 => Ok(Self::FwData),
            4 => Ok(Self::End),
            5 => Ok(Self::Abort),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

// --- Firmware kind ---

/// Which flash region an image targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FirmwareKind {
    Application = 0x01,
    Bootloader = 0x02,
}

impl TryFrom<u8> for FirmwareKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Application),
            0x02 => Ok(Self::Bootloader),
            _ => Err(ProtocolError::InvalidHeader),
        }
    }
}

// --- Image header (HEADER payload, 9 bytes packed) ---

/// Image metadata announced by the HEADER command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageHeader {
    pub total_size: u32,
    pub kind: FirmwareKind,
    pub crc: u16,
    pub version: u16,
}

impl ImageHeader {
    pub const ENCODED_LEN: usize = 9;

    /// Decode a HEADER payload. The length is checked before any field is read.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let bytes: &[u8; Self::ENCODED_LEN] = payload
            .try_into()
            .map_err(|_| ProtocolError::MalformedPayload)?;

        let total_size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let kind = FirmwareKind::try_from(bytes[4])?;
        let crc = u16::from_le_bytes([bytes[5], bytes[6]]);
        let version = u16::from_le_bytes([bytes[7], bytes[8]]);

        if total_size == 0 {
            return Err(ProtocolError::InvalidHeader);
        }

        Ok(Self {
            total_size,
            kind,
            crc,
            version,
        })
    }

    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..4].copy_from_slice(&self.total_size.to_le_bytes());
        out[4] = self.kind as u8;
        out[5..7].copy_from_slice(&self.crc.to_le_bytes());
        out[7..9].copy_from_slice(&self.version.to_le_bytes());
        out
    }
}

// --- Reboot cause ---

/// Reboot-cause word stored at the head of the configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum RebootCause {
    /// Erased configuration sector.
    FirstBoot = 0xFFFF_FFFF,
    NormalBoot = 0xBEEF_FEED,
    /// The application asked for an update session.
    OtaRequested = 0xDEAD_BEEF,
    /// The application asked to fall back to the previous image.
    LoadPrevious = 0xFACE_FADE,
}

impl RebootCause {
    pub fn from_word(word: u32) -> Option<Self> {
        match word {
            0xFFFF_FFFF => Some(Self::FirstBoot),
            0xBEEF_FEED => Some(Self::NormalBoot),
            0xDEAD_BEEF => Some(Self::OtaRequested),
            0xFACE_FADE => Some(Self::LoadPrevious),
            _ => None,
        }
    }

    pub fn as_word(self) -> u32 {
        self as u32
    }
}
