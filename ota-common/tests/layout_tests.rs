// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the flash region map.

use ota_common::config::RECORD_CAPACITY;
use ota_common::layout::{FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE};
use ota_common::mock::small_layout;
use ota_common::{FirmwareKind, FlashLayout, Region};

// --- Region tests ---

#[test]
fn test_region_len_and_contains() {
    let region = Region::new(0x1000, 0x2000);
    assert_eq!(region.len(), 0x1000);
    assert!(!region.is_empty());
    assert!(region.contains(0x1000));
    assert!(region.contains(0x1FFF));
    assert!(!region.contains(0x2000));
    assert!(!region.contains(0x0FFF));
}

#[test]
fn test_region_fits() {
    let region = Region::new(0x1000, 0x2000);
    assert!(region.fits(0, 0x1000));
    assert!(region.fits(0xFF8, 8));
    assert!(!region.fits(0xFF8, 9));
    assert!(!region.fits(0, 0x1001));
    assert!(!region.fits(u32::MAX, 2));
}

#[test]
fn test_region_overlaps() {
    let a = Region::new(0x1000, 0x2000);
    assert!(a.overlaps(&Region::new(0x1FFF, 0x3000)));
    assert!(!a.overlaps(&Region::new(0x2000, 0x3000)));
    assert!(!a.overlaps(&Region::new(0x0000, 0x1000)));
}

// --- RP2040 layout tests ---

#[test]
fn test_flash_constants() {
    assert_eq!(FLASH_BASE, 0x1000_0000);
    assert_eq!(FLASH_SECTOR_SIZE, 4096);
    assert_eq!(FLASH_PAGE_SIZE, 256);
}

#[test]
fn test_rp2040_region_addresses() {
    let layout = FlashLayout::RP2040;
    assert_eq!(layout.active_bootloader.start, FLASH_BASE);
    assert_eq!(layout.active_application.start, 0x1001_0000);
    assert_eq!(layout.spare_application.start, 0x100D_0000);
    assert_eq!(layout.spare_bootloader.start, 0x1019_0000);
    assert_eq!(layout.config.start, 0x101A_0000);
    assert_eq!(layout.slot_count, 1);
}

#[test]
fn test_rp2040_application_regions_match() {
    let layout = FlashLayout::RP2040;
    assert_eq!(layout.active_application.len(), 768 * 1024);
    assert_eq!(layout.spare_application.len(), layout.active_application.len());
    assert_eq!(layout.spare_bootloader.len(), layout.active_bootloader.len());
}

#[test]
fn test_rp2040_regions_are_sector_aligned() {
    for region in FlashLayout::RP2040.regions() {
        assert_eq!(region.start % FLASH_SECTOR_SIZE, 0);
        assert_eq!(region.end % FLASH_SECTOR_SIZE, 0);
    }
}

#[test]
fn test_regions_do_not_overlap() {
    for layout in [FlashLayout::RP2040, small_layout(1)] {
        let regions = layout.regions();
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }
}

#[test]
fn test_config_record_fits_config_sector() {
    assert!(RECORD_CAPACITY as u32 <= FlashLayout::RP2040.config.len());
}

#[test]
fn test_staging_region_by_kind() {
    let layout = FlashLayout::RP2040;
    assert_eq!(
        layout.staging_region(FirmwareKind::Application),
        layout.spare_application
    );
    assert_eq!(
        layout.staging_region(FirmwareKind::Bootloader),
        layout.spare_bootloader
    );
}
