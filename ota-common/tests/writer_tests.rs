// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for streaming image chunks into flash.

use ota_common::error::FlashError;
use ota_common::flash::compute_crc16;
use ota_common::mock::{small_layout, MockFlash};
use ota_common::writer::FlashWriter;
use ota_common::{crc16, FlashBackend, FlashGuard};

fn setup() -> (FlashWriter, MockFlash) {
    let layout = small_layout(1);
    (
        FlashWriter::new(layout.spare_application),
        MockFlash::for_layout(&layout),
    )
}

#[test]
fn test_first_chunk_erases_region() {
    let (writer, mut flash) = setup();
    let region = writer.region();
    // Stale bytes from an earlier image
    flash.write_raw(region.start + 0x100, &[0x00; 16]);

    let next = writer.write_chunk(&mut flash, 0, &[0xA5; 16], true).unwrap();

    assert_eq!(next, 16);
    assert_eq!(flash.erase_count(region), 1);
    assert_eq!(flash.contents(region.start, 16), &[0xA5; 16]);
    assert_eq!(flash.contents(region.start + 0x100, 16), &[0xFF; 16]);
}

#[test]
fn test_later_chunks_do_not_erase() {
    let (writer, mut flash) = setup();
    let offset = writer.write_chunk(&mut flash, 0, &[1; 64], true).unwrap();
    let offset = writer.write_chunk(&mut flash, offset, &[2; 64], false).unwrap();

    assert_eq!(offset, 128);
    assert_eq!(flash.erase_log().len(), 1);
    assert_eq!(flash.contents(writer.region().start + 64, 64), &[2; 64]);
}

#[test]
fn test_partial_unit_is_zero_padded() {
    let (writer, mut flash) = setup();
    writer.write_chunk(&mut flash, 0, &[0xEE; 13], true).unwrap();

    let start = writer.region().start;
    assert_eq!(flash.contents(start + 8, 8), &[0xEE, 0xEE, 0xEE, 0xEE, 0xEE, 0, 0, 0]);
    assert_eq!(flash.programmed_units(), 2);
}

#[test]
fn test_chunk_past_region_end_is_rejected() {
    let (writer, mut flash) = setup();
    let region = writer.region();

    assert_eq!(
        writer.write_chunk(&mut flash, region.len() - 8, &[0; 16], false),
        Err(FlashError::OutOfBounds {
            address: region.end - 8,
            len: 16
        })
    );
    assert_eq!(flash.unlock_count(), 0);
}

#[test]
fn test_program_failure_keeps_earlier_units() {
    let (writer, mut flash) = setup();
    flash.fail_program_after(Some(2));

    assert!(matches!(
        writer.write_chunk(&mut flash, 0, &[0x11; 32], true),
        Err(FlashError::Program { .. })
    ));
    let start = writer.region().start;
    assert_eq!(flash.contents(start, 16), &[0x11; 16]);
    assert_eq!(flash.contents(start + 16, 16), &[0xFF; 16]);
    assert_eq!(flash.unlock_count(), flash.lock_count());
    assert!(flash.is_locked());
}

#[test]
fn test_guard_rejects_misaligned_program() {
    let (_, mut flash) = setup();
    let start = small_layout(1).spare_application.start;
    let mut guard = FlashGuard::acquire(&mut flash).unwrap();
    assert_eq!(
        guard.program(start + 4, &[0; 8]),
        Err(FlashError::Misaligned { address: start + 4 })
    );
    guard.release().unwrap();
    assert!(flash.is_locked());
}

#[test]
fn test_flash_is_locked_outside_guard() {
    let (_, mut flash) = setup();
    let start = small_layout(1).spare_application.start;
    assert_eq!(
        flash.program_unit(start, &[0; 8]),
        Err(FlashError::Locked)
    );
}

#[test]
fn test_compute_crc16_streams_region() {
    let (writer, mut flash) = setup();
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
    let mut offset = 0;
    for (i, chunk) in data.chunks(128).enumerate() {
        offset = writer.write_chunk(&mut flash, offset, chunk, i == 0).unwrap();
    }

    let computed = compute_crc16(&mut flash, writer.region().start, data.len() as u32).unwrap();
    assert_eq!(computed, crc16(&data));
}
