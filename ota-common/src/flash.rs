// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash collaborator contract and the scoped unlock/lock bracket.
//!
//! Erase and program are only reachable through a [`FlashGuard`]. The guard
//! unlocks on acquisition and locks again when released or dropped, so every
//! exit path (including `?` returns) relocks the flash. It holds the backend
//! by `&mut`, which rules out a second, nested bracket.

use crate::crc16::Crc16;
use crate::error::FlashError;
use crate::layout::Region;
use crate::protocol::PROGRAM_UNIT;

/// Raw flash primitives supplied by the platform.
pub trait FlashBackend {
    fn unlock(&mut self) -> Result<(), FlashError>;

    fn lock(&mut self) -> Result<(), FlashError>;

    /// Erase every sector of `region`.
    fn erase(&mut self, region: Region) -> Result<(), FlashError>;

    /// Program one aligned unit. The target must be erased.
    fn program_unit(&mut self, address: u32, unit: &[u8; PROGRAM_UNIT]) -> Result<(), FlashError>;

    /// Read bytes at an absolute address.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError>;
}

/// Unlocked flash, relocked on drop.
pub struct FlashGuard<'a, F: FlashBackend + ?Sized> {
    flash: &'a mut F,
    released: bool,
}

impl<'a, F: FlashBackend + ?Sized> FlashGuard<'a, F> {
    /// Unlock the flash for writing.
    pub fn acquire(flash: &'a mut F) -> Result<Self, FlashError> {
        if let Err(e) = flash.unlock() {
            // Every unlock attempt is paired with a lock.
            let _ = flash.lock();
            return Err(e);
        }
        Ok(Self {
            flash,
            released: false,
        })
    }

    pub fn erase(&mut self, region: Region) -> Result<(), FlashError> {
        self.flash.erase(region)
    }

    /// Program `bytes` starting at `address` in whole units, zero-padding the
    /// final partial unit. Stops at the first failing unit; units already
    /// programmed stay programmed.
    pub fn program(&mut self, address: u32, bytes: &[u8]) -> Result<(), FlashError> {
        if address % PROGRAM_UNIT as u32 != 0 {
            return Err(FlashError::Misaligned { address });
        }

        let mut unit_addr = address;
        let mut units = bytes.chunks_exact(PROGRAM_UNIT);
        for chunk in &mut units {
            let mut unit = [0u8; PROGRAM_UNIT];
            unit.copy_from_slice(chunk);
            self.flash.program_unit(unit_addr, &unit)?;
            unit_addr += PROGRAM_UNIT as u32;
        }

        let tail = units.remainder();
        if !tail.is_empty() {
            let mut unit = [0u8; PROGRAM_UNIT];
            unit[..tail.len()].copy_from_slice(tail);
            self.flash.program_unit(unit_addr, &unit)?;
        }

        Ok(())
    }

    /// Relock explicitly, surfacing a lock failure.
    pub fn release(mut self) -> Result<(), FlashError> {
        self.released = true;
        self.flash.lock()
    }
}

impl<F: FlashBackend + ?Sized> Drop for FlashGuard<'_, F> {
    fn drop(&mut self) {
        if !self.released && self.flash.lock().is_err() {
            error!("Flash lock failed on early exit");
        }
    }
}

/// Compute the CRC-16 of `size` bytes of flash starting at `address`.
pub fn compute_crc16<F: FlashBackend + ?Sized>(
    flash: &mut F,
    address: u32,
    size: u32,
) -> Result<u16, FlashError> {
    let mut digest = Crc16::new();
    let mut remaining = size as usize;
    let mut addr = address;
    let mut chunk = [0u8; 256];

    while remaining > 0 {
        let n = remaining.min(chunk.len());
        flash.read(addr, &mut chunk[..n])?;
        digest.update(&chunk[..n]);
        addr += n as u32;
        remaining -= n;
    }

    Ok(digest.finalize())
}
