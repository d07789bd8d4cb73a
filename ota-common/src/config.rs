// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Persisted configuration record: reboot cause plus the slot table.
//!
//! Packed layout, little-endian, fixed offsets:
//!
//! ```text
//! 0   reboot_cause   u32
//! 4   slot[0]        23 bytes
//! 27  slot[1]        23 bytes
//! ...
//!
//! slot entry:
//! 0   invalid        u8   (0 = holds a usable image)
//! 1   active         u8
//! 2   pending_boot   u8
//! 3   size           u32
//! 7   crc            u32  (CRC-16 zero-extended)
//! 11  version        u16
//! 13  new_fw         u8
//! 14  reserved       9 bytes
//! ```
//!
//! The record is always read and written whole; the serialized form is
//! padded with 0xFF up to a whole number of program units.

use heapless::Vec;

use crate::error::ConfigError;
use crate::protocol::{RebootCause, MAX_SLOTS, PROGRAM_UNIT};

pub const SLOT_ENTRY_SIZE: usize = 23;
pub const RECORD_HEADER_SIZE: usize = 4;
const RESERVED_SIZE: usize = 9;

/// Upper bound of a serialized record, rounded to whole program units.
pub const RECORD_CAPACITY: usize =
    (RECORD_HEADER_SIZE + SLOT_ENTRY_SIZE * MAX_SLOTS).div_ceil(PROGRAM_UNIT) * PROGRAM_UNIT;

const ERASED: u8 = 0xFF;

// Flag byte offsets inside a slot entry
const OFF_INVALID: usize = 0;
const OFF_ACTIVE: usize = 1;
const OFF_PENDING: usize = 2;
const OFF_SIZE: usize = 3;
const OFF_CRC: usize = 7;
const OFF_VERSION: usize = 11;
const OFF_NEW_FW: usize = 13;
const OFF_RESERVED: usize = 14;

/// Index of an existing slot-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Returns `None` unless `index < slot_count`.
    pub fn new(index: u8, slot_count: u8) -> Option<Self> {
        (index < slot_count).then_some(Self(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// One slot-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotEntry {
    /// The slot holds a usable image.
    pub valid: bool,
    /// The slot's image is the one currently running.
    pub active: bool,
    /// The next reset should boot this slot.
    pub pending_boot: bool,
    pub size: u32,
    pub crc: u16,
    pub version: u16,
    pub new_firmware: bool,
    reserved: [u8; RESERVED_SIZE],
}

impl SlotEntry {
    /// Entry as read from an erased sector.
    pub const fn erased() -> Self {
        Self {
            valid: false,
            active: false,
            pending_boot: false,
            size: u32::MAX,
            crc: u16::MAX,
            version: u16::MAX,
            new_firmware: false,
            reserved: [ERASED; RESERVED_SIZE],
        }
    }

    fn encode(&self, out: &mut [u8; SLOT_ENTRY_SIZE]) {
        out[OFF_INVALID] = u8::from(!self.valid);
        out[OFF_ACTIVE] = u8::from(self.active);
        out[OFF_PENDING] = u8::from(self.pending_boot);
        out[OFF_SIZE..OFF_SIZE + 4].copy_from_slice(&self.size.to_le_bytes());
        out[OFF_CRC..OFF_CRC + 4].copy_from_slice(&(self.crc as u32).to_le_bytes());
        out[OFF_VERSION..OFF_VERSION + 2].copy_from_slice(&self.version.to_le_bytes());
        out[OFF_NEW_FW] = u8::from(self.new_firmware);
        out[OFF_RESERVED..].copy_from_slice(&self.reserved);
    }

    fn decode(slot: u8, bytes: &[u8; SLOT_ENTRY_SIZE]) -> Result<Self, ConfigError> {
        let flag = |offset: usize, erased_means: bool| -> Result<bool, ConfigError> {
            match bytes[offset] {
                0 => Ok(false),
                1 => Ok(true),
                ERASED => Ok(erased_means),
                value => Err(ConfigError::CorruptFlag {
                    slot,
                    offset: offset as u8,
                    value,
                }),
            }
        };

        let invalid = flag(OFF_INVALID, true)?;
        let active = flag(OFF_ACTIVE, false)?;
        let pending_boot = flag(OFF_PENDING, false)?;
        let new_firmware = flag(OFF_NEW_FW, false)?;

        let word = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut reserved = [0u8; RESERVED_SIZE];
        reserved.copy_from_slice(&bytes[OFF_RESERVED..]);

        Ok(Self {
            valid: !invalid,
            active,
            pending_boot,
            size: word(OFF_SIZE),
            crc: word(OFF_CRC) as u16,
            version: u16::from_le_bytes([bytes[OFF_VERSION], bytes[OFF_VERSION + 1]]),
            new_firmware,
            reserved,
        })
    }
}

/// Reboot cause and slot table, persisted in its own flash sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    pub reboot_cause: RebootCause,
    slots: Vec<SlotEntry, MAX_SLOTS>,
}

impl ConfigRecord {
    /// Record as read from an erased sector: first boot, every slot invalid.
    pub fn erased(slot_count: u8) -> Result<Self, ConfigError> {
        let mut slots = Vec::new();
        for _ in 0..slot_count {
            slots
                .push(SlotEntry::erased())
                .map_err(|_| ConfigError::TooManySlots(slot_count))?;
        }
        Ok(Self {
            reboot_cause: RebootCause::FirstBoot,
            slots,
        })
    }

    /// Serialized size for a table of `slot_count` entries, before padding.
    pub const fn encoded_len(slot_count: u8) -> usize {
        RECORD_HEADER_SIZE + SLOT_ENTRY_SIZE * slot_count as usize
    }

    pub fn slot_count(&self) -> u8 {
        self.slots.len() as u8
    }

    pub fn slots(&self) -> &[SlotEntry] {
        &self.slots
    }

    pub fn slot(&self, index: SlotIndex) -> Result<&SlotEntry, ConfigError> {
        self.slots
            .get(index.as_usize())
            .ok_or(ConfigError::InvalidSlot(index.get()))
    }

    pub fn slot_mut(&mut self, index: SlotIndex) -> Result<&mut SlotEntry, ConfigError> {
        self.slots
            .get_mut(index.as_usize())
            .ok_or(ConfigError::InvalidSlot(index.get()))
    }

    /// Slot the next reset should boot, if any.
    pub fn pending_slot(&self) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|s| s.pending_boot)
            .map(|i| SlotIndex(i as u8))
    }

    /// Pick the slot a new image should be written to.
    ///
    /// The first slot that is invalid or not active wins. A single-slot table
    /// always yields slot 0: its image runs from the active region, never from
    /// the slot, so the slot is reusable even when marked active.
    pub fn select_available_slot(&self) -> Option<SlotIndex> {
        let scanned = self
            .slots
            .iter()
            .position(|s| !s.valid || !s.active)
            .map(|i| SlotIndex(i as u8));

        match scanned {
            Some(slot) => Some(slot),
            None if self.slots.len() == 1 => Some(SlotIndex(0)),
            None => None,
        }
    }

    /// Mark a slot as not holding a usable image.
    pub fn invalidate(&mut self, index: SlotIndex) -> Result<(), ConfigError> {
        self.slot_mut(index)?.valid = false;
        Ok(())
    }

    /// Record a freshly written image and make it the only pending-boot slot.
    pub fn commit(
        &mut self,
        index: SlotIndex,
        size: u32,
        crc: u16,
        version: u16,
    ) -> Result<(), ConfigError> {
        let slot = self.slot_mut(index)?;
        slot.valid = true;
        slot.size = size;
        slot.crc = crc;
        slot.version = version;
        slot.pending_boot = true;
        slot.new_firmware = true;

        for (i, other) in self.slots.iter_mut().enumerate() {
            if i != index.as_usize() {
                other.pending_boot = false;
            }
        }

        self.reboot_cause = RebootCause::NormalBoot;
        Ok(())
    }

    /// Serialize, padded with 0xFF to whole program units.
    pub fn serialize(&self) -> Vec<u8, RECORD_CAPACITY> {
        let mut out: Vec<u8, RECORD_CAPACITY> = Vec::new();
        // Slot count is bounded by MAX_SLOTS, so the record always fits RECORD_CAPACITY.
        let _ = out.extend_from_slice(&self.reboot_cause.as_word().to_le_bytes());

        for slot in &self.slots {
            let mut entry = [0u8; SLOT_ENTRY_SIZE];
            slot.encode(&mut entry);
            let _ = out.extend_from_slice(&entry);
        }

        while out.len() % PROGRAM_UNIT != 0 {
            let _ = out.push(ERASED);
        }
        out
    }

    /// Parse a record holding `slot_count` slots.
    pub fn deserialize(bytes: &[u8], slot_count: u8) -> Result<Self, ConfigError> {
        if slot_count as usize > MAX_SLOTS {
            return Err(ConfigError::TooManySlots(slot_count));
        }

        let needed = Self::encoded_len(slot_count);
        if bytes.len() < needed {
            return Err(ConfigError::Truncated {
                needed,
                available: bytes.len(),
            });
        }

        let word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let reboot_cause =
            RebootCause::from_word(word).ok_or(ConfigError::UnknownRebootCause(word))?;

        let mut slots = Vec::new();
        for (i, raw) in bytes[RECORD_HEADER_SIZE..needed]
            .chunks_exact(SLOT_ENTRY_SIZE)
            .enumerate()
        {
            let mut entry = [0u8; SLOT_ENTRY_SIZE];
            entry.copy_from_slice(raw);
            slots
                .push(SlotEntry::decode(i as u8, &entry)?)
                .map_err(|_| ConfigError::TooManySlots(slot_count))?;
        }

        Ok(Self {
            reboot_cause,
            slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_capacity_is_unit_aligned() {
        assert_eq!(RECORD_CAPACITY % PROGRAM_UNIT, 0);
        assert!(RECORD_CAPACITY >= ConfigRecord::encoded_len(MAX_SLOTS as u8));
    }

    #[test]
    fn test_slot_index_bounds() {
        assert!(SlotIndex::new(0, 1).is_some());
        assert!(SlotIndex::new(1, 1).is_none());
        assert!(SlotIndex::new(0, 0).is_none());
    }
}
