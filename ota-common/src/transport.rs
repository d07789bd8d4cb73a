// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Pulls whole frames off a [`SerialLink`].
//!
//! The reader waits indefinitely for a start marker (link idle), then every
//! further byte of the frame must arrive within the per-byte timeout (link
//! stalled mid-frame). A rejected frame is dropped whole; the link is not
//! resynchronized beyond what the timeouts already provide.

use crate::error::TransportError;
use crate::frame::{Frame, Response};
use crate::link::{SerialLink, Timeout};
use crate::protocol::{FRAME_OVERHEAD, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, SOF};

/// Receive and validate one frame.
pub fn receive_frame<L: SerialLink + ?Sized>(
    link: &mut L,
    byte_timeout_ms: u32,
) -> Result<Frame, TransportError> {
    let first = link.receive_byte(Timeout::Forever)?;
    if first != SOF {
        return Err(TransportError::Framing);
    }

    let timeout = Timeout::Millis(byte_timeout_ms);
    let mut buf = [0u8; MAX_FRAME_SIZE];
    buf[0] = first;

    // Command byte and length field
    for slot in &mut buf[1..4] {
        *slot = link.receive_byte(timeout)?;
    }

    let declared = u16::from_le_bytes([buf[2], buf[3]]);
    if declared as usize > MAX_PAYLOAD_SIZE {
        return Err(TransportError::Overflow { declared });
    }

    let total = declared as usize + FRAME_OVERHEAD;
    for slot in &mut buf[4..total] {
        *slot = link.receive_byte(timeout)?;
    }

    Frame::decode(&buf[..total])
}

/// Encode and transmit one frame.
pub fn send_frame<L: SerialLink + ?Sized>(link: &mut L, frame: &Frame) -> Result<(), TransportError> {
    link.transmit(&frame.encode())?;
    Ok(())
}

/// Transmit an ACK/NACK response frame.
pub fn send_response<L: SerialLink + ?Sized>(
    link: &mut L,
    response: Response,
) -> Result<(), TransportError> {
    send_frame(link, &response.to_frame())
}
