// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the flash-backed slot table.

use ota_common::error::{ConfigError, FlashError, OtaError, ProtocolError};
use ota_common::mock::{small_layout, MockFlash};
use ota_common::{ConfigRecord, FlashLayout, RebootCause, Region, SlotIndex, SlotStore};

fn setup(slot_count: u8) -> (SlotStore, MockFlash) {
    let layout = small_layout(slot_count);
    (SlotStore::new(layout), MockFlash::for_layout(&layout))
}

fn slot(index: u8, count: u8) -> SlotIndex {
    SlotIndex::new(index, count).unwrap()
}

fn assert_lock_balanced(flash: &MockFlash) {
    assert_eq!(flash.unlock_count(), flash.lock_count());
    assert!(flash.is_locked());
}

// =============================================================================
// Load / store
// =============================================================================

#[test]
fn test_load_erased_sector_is_first_boot() {
    let (store, mut flash) = setup(1);
    let record = store.load(&mut flash).unwrap();
    assert_eq!(record, ConfigRecord::erased(1).unwrap());
}

#[test]
fn test_store_then_load() {
    let (store, mut flash) = setup(2);
    let mut record = ConfigRecord::erased(2).unwrap();
    record.commit(slot(1, 2), 100, 0x4242, 3).unwrap();

    store.store(&mut flash, &record).unwrap();

    assert_eq!(store.load(&mut flash).unwrap(), record);
    assert_eq!(flash.erase_count(small_layout(2).config), 1);
    assert_lock_balanced(&flash);
}

#[test]
fn test_store_overwrites_previous_record() {
    let (store, mut flash) = setup(1);
    store.commit(&mut flash, slot(0, 1), 10, 0x1111, 1).unwrap();
    store.commit(&mut flash, slot(0, 1), 20, 0x2222, 2).unwrap();

    let entry = *store.load(&mut flash).unwrap().slot(slot(0, 1)).unwrap();
    assert_eq!(entry.size, 20);
    assert_eq!(entry.crc, 0x2222);
    assert_eq!(entry.version, 2);
}

#[test]
fn test_strict_load_rejects_corrupt_record() {
    let (store, mut flash) = setup(1);
    let config = small_layout(1).config;
    flash.write_raw(config.start + 4, &[0x55]);

    assert_eq!(
        store.load(&mut flash),
        Err(OtaError::Config(ConfigError::CorruptFlag {
            slot: 0,
            offset: 0,
            value: 0x55
        }))
    );
}

#[test]
fn test_lenient_load_falls_back_to_erased_record() {
    let (store, mut flash) = setup(1);
    let config = small_layout(1).config;
    flash.write_raw(config.start, &0x0BAD_0BADu32.to_le_bytes());

    assert_eq!(
        store.load_or_default(&mut flash),
        Ok(ConfigRecord::erased(1).unwrap())
    );
}

#[test]
fn test_lenient_load_propagates_read_failure() {
    let layout = small_layout(1);
    let store = SlotStore::new(layout);
    let mut flash = MockFlash::new(0x2000_0000, 64);

    assert_eq!(
        store.load_or_default(&mut flash),
        Err(OtaError::Flash(FlashError::Read {
            address: layout.config.start
        }))
    );
}

#[test]
fn test_record_larger_than_config_region() {
    let layout = FlashLayout {
        config: Region::new(0x1000_6000, 0x1000_6010),
        ..small_layout(1)
    };
    let store = SlotStore::new(layout);
    let mut flash = MockFlash::for_layout(&layout);

    assert_eq!(
        store.store(&mut flash, &ConfigRecord::erased(1).unwrap()),
        Err(OtaError::Config(ConfigError::DoesNotFit {
            size: 32,
            capacity: 16
        }))
    );
    assert_eq!(flash.unlock_count(), 0);
}

// =============================================================================
// Slot operations
// =============================================================================

#[test]
fn test_select_on_erased_sector() {
    let (store, mut flash) = setup(1);
    assert_eq!(store.select_available_slot(&mut flash), Ok(slot(0, 1)));
}

#[test]
fn test_select_fails_when_every_slot_is_active() {
    let (store, mut flash) = setup(2);
    let mut record = ConfigRecord::erased(2).unwrap();
    for i in 0..2 {
        let entry = record.slot_mut(slot(i, 2)).unwrap();
        entry.valid = true;
        entry.active = true;
    }
    store.store(&mut flash, &record).unwrap();

    assert_eq!(
        store.select_available_slot(&mut flash),
        Err(OtaError::Protocol(ProtocolError::NoSlotAvailable))
    );
}

#[test]
fn test_invalidate_is_written_through() {
    let (store, mut flash) = setup(1);
    store.commit(&mut flash, slot(0, 1), 64, 0xABCD, 1).unwrap();

    store.invalidate(&mut flash, slot(0, 1)).unwrap();

    let record = store.load(&mut flash).unwrap();
    let entry = record.slot(slot(0, 1)).unwrap();
    assert!(!entry.valid);
    assert_eq!(entry.size, 64);
    assert_lock_balanced(&flash);
}

#[test]
fn test_commit_is_written_through() {
    let (store, mut flash) = setup(2);
    store.commit(&mut flash, slot(0, 2), 64, 0x0001, 1).unwrap();
    store.commit(&mut flash, slot(1, 2), 128, 0x0002, 2).unwrap();

    let record = store.load(&mut flash).unwrap();
    assert_eq!(record.reboot_cause, RebootCause::NormalBoot);
    assert_eq!(record.pending_slot(), Some(slot(1, 2)));
    assert!(!record.slots()[0].pending_boot);
    assert!(record.slots()[0].valid);
}

// =============================================================================
// Reboot cause
// =============================================================================

#[test]
fn test_request_update_sets_reboot_cause() {
    let (store, mut flash) = setup(1);
    store.commit(&mut flash, slot(0, 1), 32, 0x7777, 5).unwrap();

    store.request_update(&mut flash).unwrap();

    let record = store.load(&mut flash).unwrap();
    assert_eq!(record.reboot_cause, RebootCause::OtaRequested);
    assert_eq!(record.slots()[0].version, 5);
}

#[test]
fn test_request_previous_sets_reboot_cause() {
    let (store, mut flash) = setup(1);
    store.request_previous(&mut flash).unwrap();
    assert_eq!(
        store.load(&mut flash).unwrap().reboot_cause,
        RebootCause::LoadPrevious
    );
}

#[test]
fn test_unchanged_reboot_cause_skips_write() {
    let (store, mut flash) = setup(1);
    store.set_reboot_cause(&mut flash, RebootCause::FirstBoot).unwrap();
    assert!(flash.erase_log().is_empty());
    assert_eq!(flash.unlock_count(), 0);
}

// =============================================================================
// Failure paths
// =============================================================================

#[test]
fn test_power_loss_between_erase_and_program() {
    let (store, mut flash) = setup(1);
    store.commit(&mut flash, slot(0, 1), 64, 0x1234, 1).unwrap();

    flash.fail_program_after(Some(0));
    let result = store.commit(&mut flash, slot(0, 1), 96, 0x5678, 2);
    assert!(matches!(
        result,
        Err(OtaError::Flash(FlashError::Program { .. }))
    ));
    assert_lock_balanced(&flash);

    // Erased-but-unwritten sector: first boot, nothing bootable
    let record = store.load(&mut flash).unwrap();
    assert_eq!(record.reboot_cause, RebootCause::FirstBoot);
    assert!(record.slots().iter().all(|s| !s.valid && !s.pending_boot));
}

#[test]
fn test_unlock_failure_still_relocks() {
    let (store, mut flash) = setup(1);
    flash.fail_unlock(true);

    assert_eq!(
        store.invalidate(&mut flash, slot(0, 1)),
        Err(OtaError::Flash(FlashError::Unlock))
    );
    assert_eq!(flash.unlock_count(), 1);
    assert_eq!(flash.lock_count(), 1);
}

#[test]
fn test_erase_failure_relocks() {
    let (store, mut flash) = setup(1);
    flash.fail_erase(true);

    assert!(matches!(
        store.commit(&mut flash, slot(0, 1), 1, 0, 0),
        Err(OtaError::Flash(FlashError::Erase { .. }))
    ));
    assert_lock_balanced(&flash);
}
