// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for pulling frames off a serial link.

use ota_common::error::TransportError;
use ota_common::mock::MockLink;
use ota_common::transport::{receive_frame, send_frame, send_response};
use ota_common::{Command, Frame, Response, Timeout, EOF, SOF};

const BYTE_TIMEOUT: u32 = 250;

fn start_frame() -> Frame {
    Frame::new(Command::Start.as_byte(), &[0x01]).unwrap()
}

// =============================================================================
// Receiving
// =============================================================================

#[test]
fn test_receive_valid_frame() {
    let mut link = MockLink::new();
    link.push_frame(&start_frame());

    let frame = receive_frame(&mut link, BYTE_TIMEOUT).unwrap();
    assert_eq!(frame, start_frame());
    assert_eq!(link.pending(), 0);
}

#[test]
fn test_first_byte_waits_forever_then_per_byte_timeout() {
    let mut link = MockLink::new();
    link.push_frame(&start_frame());

    receive_frame(&mut link, BYTE_TIMEOUT).unwrap();

    let timeouts = link.timeouts();
    assert_eq!(timeouts.len(), 8);
    assert_eq!(timeouts[0], Timeout::Forever);
    assert!(timeouts[1..].iter().all(|t| *t == Timeout::Millis(BYTE_TIMEOUT)));
}

#[test]
fn test_receive_back_to_back_frames() {
    let mut link = MockLink::new();
    link.push_frame(&start_frame());
    link.push_command(Command::End, &[]);

    assert_eq!(
        receive_frame(&mut link, BYTE_TIMEOUT).unwrap().command(),
        Ok(Command::Start)
    );
    assert_eq!(
        receive_frame(&mut link, BYTE_TIMEOUT).unwrap().command(),
        Ok(Command::End)
    );
}

#[test]
fn test_non_start_byte_is_rejected_immediately() {
    let mut link = MockLink::new();
    link.push_bytes(&[0x00, SOF]);

    assert_eq!(
        receive_frame(&mut link, BYTE_TIMEOUT),
        Err(TransportError::Framing)
    );
    // Only the offending byte is consumed
    assert_eq!(link.pending(), 1);
}

#[test]
fn test_stall_mid_frame_times_out() {
    let mut link = MockLink::new();
    link.push_bytes(&[SOF, Command::FwData.as_byte(), 0x08, 0x00, 1, 2, 3]);
    link.push_stall();

    assert_eq!(
        receive_frame(&mut link, BYTE_TIMEOUT),
        Err(TransportError::Timeout)
    );
}

#[test]
fn test_silent_line_reports_timeout() {
    let mut link = MockLink::new();
    assert_eq!(
        receive_frame(&mut link, BYTE_TIMEOUT),
        Err(TransportError::Timeout)
    );
}

#[test]
fn test_oversized_length_stops_reading() {
    let mut link = MockLink::new();
    link.push_bytes(&[SOF, Command::FwData.as_byte(), 0x00, 0x02]);
    link.push_bytes(&[0xAB; 16]);

    assert_eq!(
        receive_frame(&mut link, BYTE_TIMEOUT),
        Err(TransportError::Overflow { declared: 0x0200 })
    );
    assert_eq!(link.pending(), 16);
}

#[test]
fn test_bad_end_marker_is_framing_error() {
    let mut bytes = start_frame().encode().to_vec();
    let last = bytes.len() - 1;
    bytes[last] = EOF ^ 0x01;

    let mut link = MockLink::new();
    link.push_bytes(&bytes);
    assert_eq!(
        receive_frame(&mut link, BYTE_TIMEOUT),
        Err(TransportError::Framing)
    );
}

#[test]
fn test_bad_crc_is_integrity_error() {
    let mut bytes = start_frame().encode().to_vec();
    bytes[5] ^= 0xFF;

    let mut link = MockLink::new();
    link.push_bytes(&bytes);
    assert!(matches!(
        receive_frame(&mut link, BYTE_TIMEOUT),
        Err(TransportError::Integrity { .. })
    ));
}

// =============================================================================
// Sending
// =============================================================================

#[test]
fn test_send_response_echoes_command() {
    let mut link = MockLink::new();
    send_response(&mut link, Response::ack(Command::Header.as_byte())).unwrap();
    send_response(&mut link, Response::nack(Command::FwData.as_byte())).unwrap();

    assert_eq!(
        link.responses(),
        vec![
            Response::ack(Command::Header.as_byte()),
            Response::nack(Command::FwData.as_byte()),
        ]
    );
}

#[test]
fn test_send_frame_writes_encoded_bytes() {
    let mut link = MockLink::new();
    let frame = start_frame();
    send_frame(&mut link, &frame).unwrap();
    assert_eq!(link.sent(), frame.encode().as_slice());
}

#[test]
fn test_transmit_failure_is_link_error() {
    let mut link = MockLink::new();
    link.fail_transmit(true);
    assert_eq!(
        send_response(&mut link, Response::ack(1)),
        Err(TransportError::Link)
    );
}
