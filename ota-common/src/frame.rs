// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Frame layout and encode/decode.
//!
//! ```text
//! SOF(1)=0x2A | CMD(1) | LEN(2) | PAYLOAD(LEN) | CRC16(2) | EOF(1)=0x23
//! ```
//!
//! The CRC covers CMD, LEN and PAYLOAD exactly.

use heapless::Vec;

use crate::crc16::Crc16;
use crate::error::{ProtocolError, TransportError};
use crate::protocol::{Command, ACK, EOF, FRAME_OVERHEAD, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, NACK, SOF};

/// One length-delimited, CRC-protected unit of wire communication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: u8,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Build a frame from a raw command byte and payload.
    pub fn new(command: u8, payload: &[u8]) -> Result<Self, TransportError> {
        let payload = Vec::from_slice(payload).map_err(|_| TransportError::Overflow {
            declared: payload.len().min(u16::MAX as usize) as u16,
        })?;
        Ok(Self { command, payload })
    }

    pub fn command_byte(&self) -> u8 {
        self.command
    }

    /// Interpret the command byte.
    pub fn command(&self) -> Result<Command, ProtocolError> {
        Command::try_from(self.command)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of bytes this frame occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }

    /// CRC over the command byte, length field and payload.
    pub fn crc(&self) -> u16 {
        let len = (self.payload.len() as u16).to_le_bytes();
        let mut digest = Crc16::new();
        digest.update(&[self.command, len[0], len[1]]);
        digest.update(&self.payload);
        digest.finalize()
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut out: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        let len = (self.payload.len() as u16).to_le_bytes();
        // Capacity is MAX_PAYLOAD_SIZE + FRAME_OVERHEAD, so every push fits.
        let _ = out.push(SOF);
        let _ = out.push(self.command);
        let _ = out.extend_from_slice(&len);
        let _ = out.extend_from_slice(&self.payload);
        let _ = out.extend_from_slice(&self.crc().to_le_bytes());
        let _ = out.push(EOF);
        out
    }

    /// Parse and validate one complete frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        if bytes.first() != Some(&SOF) {
            return Err(TransportError::Framing);
        }
        if bytes.len() < FRAME_OVERHEAD {
            return Err(TransportError::Framing);
        }

        let declared = u16::from_le_bytes([bytes[2], bytes[3]]);
        let len = declared as usize;
        if len > MAX_PAYLOAD_SIZE {
            return Err(TransportError::Overflow { declared });
        }
        if bytes.len() != len + FRAME_OVERHEAD || bytes[bytes.len() - 1] != EOF {
            return Err(TransportError::Framing);
        }

        let crc_at = 4 + len;
        let received = u16::from_le_bytes([bytes[crc_at], bytes[crc_at + 1]]);
        let frame = Self::new(bytes[1], &bytes[4..crc_at])?;
        let computed = frame.crc();
        if computed != received {
            return Err(TransportError::Integrity { received, computed });
        }

        Ok(frame)
    }
}

/// ACK/NACK response echoing the command it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Response {
    pub command: u8,
    pub status: u8,
}

impl Response {
    pub fn ack(command: u8) -> Self {
        Self {
            command,
            status: ACK,
        }
    }

    pub fn nack(command: u8) -> Self {
        Self {
            command,
            status: NACK,
        }
    }

    pub fn is_ack(&self) -> bool {
        self.status == ACK
    }

    pub fn to_frame(self) -> Frame {
        Frame {
            command: self.command,
            payload: Vec::from_slice(&[self.status]).unwrap_or_default(),
        }
    }

    /// Interpret a received frame as a response. The payload must be a single status byte.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        match frame.payload() {
            [status @ (ACK | NACK)] => Ok(Self {
                command: frame.command_byte(),
                status: *status,
            }),
            _ => Err(ProtocolError::MalformedPayload),
        }
    }
}
