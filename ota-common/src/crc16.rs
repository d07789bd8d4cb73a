// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! CRC-16 used for frames and firmware images.
//!
//! Polynomial 0x1021, initial value 0xFFFF, no reflection, no final XOR
//! (`CRC_16_IBM_3740`). Host and device must both use this exact variant.

use crc::{Crc, Digest, CRC_16_IBM_3740};

static CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Incremental CRC-16 digest, for data that arrives in pieces.
#[derive(Clone)]
pub struct Crc16 {
    digest: Digest<'static, u16>,
}

impl Crc16 {
    pub fn new() -> Self {
        Self {
            digest: CRC16.digest(),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    pub fn finalize(self) -> u16 {
        self.digest.finalize()
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-16 of a complete buffer.
pub fn crc16(bytes: &[u8]) -> u16 {
    CRC16.checksum(bytes)
}
