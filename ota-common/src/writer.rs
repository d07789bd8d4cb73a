// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Streams image bytes into a staging region.

use crate::error::FlashError;
use crate::flash::{FlashBackend, FlashGuard};
use crate::layout::Region;

/// Writes consecutive chunks of one image into `region`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashWriter {
    region: Region,
}

impl FlashWriter {
    pub fn new(region: Region) -> Self {
        Self { region }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    /// Write `bytes` at `offset` from the region start and return the new offset.
    ///
    /// The first chunk of an image erases the whole region before anything is
    /// programmed. A failing unit aborts the chunk; units already programmed
    /// are left in place.
    pub fn write_chunk<F: FlashBackend + ?Sized>(
        &self,
        flash: &mut F,
        offset: u32,
        bytes: &[u8],
        is_first_chunk: bool,
    ) -> Result<u32, FlashError> {
        let len = bytes.len() as u32;
        if !self.region.fits(offset, len) {
            return Err(FlashError::OutOfBounds {
                address: self.region.start.wrapping_add(offset),
                len,
            });
        }

        let mut guard = FlashGuard::acquire(flash)?;

        if is_first_chunk {
            debug!("Erasing staging region at {:#x}", self.region.start);
            guard.erase(self.region)?;
        }

        guard.program(self.region.start + offset, bytes)?;
        guard.release()?;

        Ok(offset + len)
    }
}
