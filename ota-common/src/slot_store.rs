// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Read-modify-write access to the persisted configuration sector.
//!
//! Every mutation reads the whole record, changes it in memory, erases the
//! configuration sector and programs the record back. A power loss between the
//! erase and the program leaves the sector erased, which decodes as a
//! first-boot record with every slot invalid: the device falls back to update
//! mode instead of booting a half-described image.

use crate::config::{ConfigRecord, SlotIndex, RECORD_CAPACITY};
use crate::error::{ConfigError, OtaError, ProtocolError};
use crate::flash::{FlashBackend, FlashGuard};
use crate::layout::FlashLayout;
use crate::protocol::RebootCause;

/// Slot table persisted in [`FlashLayout::config`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStore {
    layout: FlashLayout,
}

impl SlotStore {
    pub fn new(layout: FlashLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Read and strictly decode the record.
    pub fn load<F: FlashBackend + ?Sized>(&self, flash: &mut F) -> Result<ConfigRecord, OtaError> {
        let slot_count = self.layout.slot_count;
        let len = ConfigRecord::encoded_len(slot_count);
        if len > RECORD_CAPACITY {
            return Err(ConfigError::TooManySlots(slot_count).into());
        }

        let mut buf = [0u8; RECORD_CAPACITY];
        flash.read(self.layout.config.start, &mut buf[..len])?;
        Ok(ConfigRecord::deserialize(&buf[..len], slot_count)?)
    }

    /// Read the record, replacing a malformed one with the erased default.
    ///
    /// Flash read failures still propagate.
    pub fn load_or_default<F: FlashBackend + ?Sized>(
        &self,
        flash: &mut F,
    ) -> Result<ConfigRecord, OtaError> {
        match self.load(flash) {
            Ok(record) => Ok(record),
            Err(OtaError::Config(e)) => {
                warn!("Config record unreadable, using defaults: {}", e);
                Ok(ConfigRecord::erased(self.layout.slot_count)?)
            }
            Err(e) => Err(e),
        }
    }

    /// Erase the configuration sector and program `record` into it.
    pub fn store<F: FlashBackend + ?Sized>(
        &self,
        flash: &mut F,
        record: &ConfigRecord,
    ) -> Result<(), OtaError> {
        let bytes = record.serialize();
        let capacity = self.layout.config.len();
        if bytes.len() as u32 > capacity {
            return Err(ConfigError::DoesNotFit {
                size: bytes.len() as u32,
                capacity,
            }
            .into());
        }

        let mut guard = FlashGuard::acquire(flash)?;
        guard.erase(self.layout.config)?;
        guard.program(self.layout.config.start, &bytes)?;
        guard.release()?;
        Ok(())
    }

    /// Choose the slot a new image is recorded in.
    pub fn select_available_slot<F: FlashBackend + ?Sized>(
        &self,
        flash: &mut F,
    ) -> Result<SlotIndex, OtaError> {
        let record = self.load_or_default(flash)?;
        match record.select_available_slot() {
            Some(slot) => Ok(slot),
            None => Err(ProtocolError::NoSlotAvailable.into()),
        }
    }

    /// Clear the slot's validity flag.
    pub fn invalidate<F: FlashBackend + ?Sized>(
        &self,
        flash: &mut F,
        slot: SlotIndex,
    ) -> Result<(), OtaError> {
        let mut record = self.load_or_default(flash)?;
        record.invalidate(slot)?;
        self.store(flash, &record)
    }

    /// Record a written image and make its slot the only one pending boot.
    pub fn commit<F: FlashBackend + ?Sized>(
        &self,
        flash: &mut F,
        slot: SlotIndex,
        size: u32,
        crc: u16,
        version: u16,
    ) -> Result<(), OtaError> {
        let mut record = self.load_or_default(flash)?;
        record.commit(slot, size, crc, version)?;
        self.store(flash, &record)
    }

    pub fn set_reboot_cause<F: FlashBackend + ?Sized>(
        &self,
        flash: &mut F,
        cause: RebootCause,
    ) -> Result<(), OtaError> {
        let mut record = self.load_or_default(flash)?;
        if record.reboot_cause == cause {
            return Ok(());
        }
        record.reboot_cause = cause;
        self.store(flash, &record)
    }

    /// Ask the bootloader for an update session on next reset.
    pub fn request_update<F: FlashBackend + ?Sized>(&self, flash: &mut F) -> Result<(), OtaError> {
        self.set_reboot_cause(flash, RebootCause::OtaRequested)
    }

    /// Ask the bootloader to fall back to the previous image on next reset.
    pub fn request_previous<F: FlashBackend + ?Sized>(&self, flash: &mut F) -> Result<(), OtaError> {
        self.set_reboot_cause(flash, RebootCause::LoadPrevious)
    }
}
