// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash region map.
//!
//! Exact addresses are platform constants; the update engine only sees a
//! [`FlashLayout`] value.

use crate::protocol::FirmwareKind;

/// Half-open address range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub start: u32,
    pub end: u32,
}

impl Region {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub const fn contains(&self, address: u32) -> bool {
        address >= self.start && address < self.end
    }

    /// Whether `len` bytes at `offset` from the region start stay inside it.
    pub const fn fits(&self, offset: u32, len: u32) -> bool {
        match offset.checked_add(len) {
            Some(end) => end <= self.len(),
            None => false,
        }
    }

    pub const fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Named flash regions plus the slot-table geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashLayout {
    pub active_bootloader: Region,
    pub active_application: Region,
    pub spare_application: Region,
    pub spare_bootloader: Region,
    pub config: Region,
    /// Number of entries in the persisted slot table.
    pub slot_count: u8,
}

// --- RP2040 layout (2MB QSPI flash mapped at 0x1000_0000) ---

pub const FLASH_BASE: u32 = 0x1000_0000;
pub const FLASH_SECTOR_SIZE: u32 = 4096;
pub const FLASH_PAGE_SIZE: u32 = 256;

impl FlashLayout {
    pub const RP2040: FlashLayout = FlashLayout {
        active_bootloader: Region::new(0x1000_0000, 0x1001_0000), // 64KB
        active_application: Region::new(0x1001_0000, 0x100D_0000), // 768KB
        spare_application: Region::new(0x100D_0000, 0x1019_0000), // 768KB
        spare_bootloader: Region::new(0x1019_0000, 0x101A_0000),  // 64KB
        config: Region::new(0x101A_0000, 0x101A_1000),            // 4KB
        slot_count: 1,
    };

    /// Region an image of the given kind is staged into.
    pub fn staging_region(&self, kind: FirmwareKind) -> Region {
        match kind {
            FirmwareKind::Application => self.spare_application,
            FirmwareKind::Bootloader => self.spare_bootloader,
        }
    }

    pub fn regions(&self) -> [Region; 5] {
        [
            self.active_bootloader,
            self.active_application,
            self.spare_application,
            self.spare_bootloader,
            self.config,
        ]
    }
}
