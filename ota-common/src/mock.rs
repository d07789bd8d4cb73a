// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! In-memory flash and serial link for host tests and tooling.

use std::collections::VecDeque;

use crate::error::{FlashError, LinkError};
use crate::flash::FlashBackend;
use crate::frame::{Frame, Response};
use crate::layout::{FlashLayout, Region};
use crate::link::{SerialLink, Timeout};
use crate::protocol::{Command, FRAME_OVERHEAD, PROGRAM_UNIT};

/// Compact layout of 4KB regions for tests.
///
/// ```text
/// 0x1000_0000  active bootloader   4KB
/// 0x1000_1000  active application  8KB
/// 0x1000_3000  spare application   8KB
/// 0x1000_5000  spare bootloader    4KB
/// 0x1000_6000  config              4KB
/// ```
pub fn small_layout(slot_count: u8) -> FlashLayout {
    FlashLayout {
        active_bootloader: Region::new(0x1000_0000, 0x1000_1000),
        active_application: Region::new(0x1000_1000, 0x1000_3000),
        spare_application: Region::new(0x1000_3000, 0x1000_5000),
        spare_bootloader: Region::new(0x1000_5000, 0x1000_6000),
        config: Region::new(0x1000_6000, 0x1000_7000),
        slot_count,
    }
}

/// NOR-like flash held in memory.
///
/// Erase sets bytes to 0xFF; programming can only clear bits. Erase and
/// program require the flash to be unlocked.
#[derive(Debug, Clone)]
pub struct MockFlash {
    base: u32,
    memory: Vec<u8>,
    unlocked: bool,
    unlock_count: usize,
    lock_count: usize,
    erase_log: Vec<Region>,
    programmed_units: usize,
    fail_unlock: bool,
    fail_erase: bool,
    fail_program_after: Option<usize>,
}

impl MockFlash {
    /// Erased flash of `size` bytes mapped at `base`.
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            memory: vec![0xFF; size],
            unlocked: false,
            unlock_count: 0,
            lock_count: 0,
            erase_log: Vec::new(),
            programmed_units: 0,
            fail_unlock: false,
            fail_erase: false,
            fail_program_after: None,
        }
    }

    /// Erased flash covering every region of `layout`.
    pub fn for_layout(layout: &FlashLayout) -> Self {
        let regions = layout.regions();
        let start = regions.iter().map(|r| r.start).min().unwrap_or(0);
        let end = regions.iter().map(|r| r.end).max().unwrap_or(0);
        Self::new(start, (end - start) as usize)
    }

    fn span(&self, address: u32, len: usize) -> Option<core::ops::Range<usize>> {
        let start = address.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        (end <= self.memory.len()).then_some(start..end)
    }

    /// Bytes at an absolute address. Panics outside the mapped range.
    pub fn contents(&self, address: u32, len: usize) -> &[u8] {
        let span = self
            .span(address, len)
            .unwrap_or_else(|| panic!("{} bytes at {:#x} outside mock flash", len, address));
        &self.memory[span]
    }

    /// Overwrite memory directly, bypassing lock state and NOR semantics.
    pub fn write_raw(&mut self, address: u32, bytes: &[u8]) {
        let span = self
            .span(address, bytes.len())
            .unwrap_or_else(|| panic!("{} bytes at {:#x} outside mock flash", bytes.len(), address));
        self.memory[span].copy_from_slice(bytes);
    }

    pub fn erase_log(&self) -> &[Region] {
        &self.erase_log
    }

    /// How many times exactly `region` was erased.
    pub fn erase_count(&self, region: Region) -> usize {
        self.erase_log.iter().filter(|r| **r == region).count()
    }

    pub fn unlock_count(&self) -> usize {
        self.unlock_count
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count
    }

    pub fn is_locked(&self) -> bool {
        !self.unlocked
    }

    pub fn programmed_units(&self) -> usize {
        self.programmed_units
    }

    pub fn fail_unlock(&mut self, fail: bool) {
        self.fail_unlock = fail;
    }

    pub fn fail_erase(&mut self, fail: bool) {
        self.fail_erase = fail;
    }

    /// Let `units` more program operations succeed, then fail every one after.
    pub fn fail_program_after(&mut self, units: Option<usize>) {
        self.fail_program_after = units.map(|n| self.programmed_units + n);
    }
}

impl FlashBackend for MockFlash {
    fn unlock(&mut self) -> Result<(), FlashError> {
        self.unlock_count += 1;
        if self.fail_unlock {
            return Err(FlashError::Unlock);
        }
        self.unlocked = true;
        Ok(())
    }

    fn lock(&mut self) -> Result<(), FlashError> {
        self.lock_count += 1;
        self.unlocked = false;
        Ok(())
    }

    fn erase(&mut self, region: Region) -> Result<(), FlashError> {
        if !self.unlocked {
            return Err(FlashError::Locked);
        }
        if self.fail_erase {
            return Err(FlashError::Erase {
                address: region.start,
            });
        }
        let span = self
            .span(region.start, region.len() as usize)
            .ok_or(FlashError::OutOfBounds {
                address: region.start,
                len: region.len(),
            })?;
        self.memory[span].fill(0xFF);
        self.erase_log.push(region);
        Ok(())
    }

    fn program_unit(&mut self, address: u32, unit: &[u8; PROGRAM_UNIT]) -> Result<(), FlashError> {
        if !self.unlocked {
            return Err(FlashError::Locked);
        }
        if address % PROGRAM_UNIT as u32 != 0 {
            return Err(FlashError::Misaligned { address });
        }
        if self
            .fail_program_after
            .is_some_and(|limit| self.programmed_units >= limit)
        {
            return Err(FlashError::Program { address });
        }
        let span = self.span(address, PROGRAM_UNIT).ok_or(FlashError::OutOfBounds {
            address,
            len: PROGRAM_UNIT as u32,
        })?;
        for (cell, byte) in self.memory[span].iter_mut().zip(unit) {
            *cell &= *byte;
        }
        self.programmed_units += 1;
        Ok(())
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        let span = self
            .span(address, buf.len())
            .ok_or(FlashError::Read { address })?;
        buf.copy_from_slice(&self.memory[span]);
        Ok(())
    }
}

/// One scripted receive event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxEvent {
    Byte(u8),
    /// The next receive times out.
    Stall,
}

/// Scripted serial link.
///
/// Receives pop from a queue; an empty queue behaves like a silent line.
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    rx: VecDeque<RxEvent>,
    tx: Vec<u8>,
    timeouts: Vec<Timeout>,
    fail_transmit: bool,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied().map(RxEvent::Byte));
    }

    pub fn push_stall(&mut self) {
        self.rx.push_back(RxEvent::Stall);
    }

    pub fn push_frame(&mut self, frame: &Frame) {
        self.push_bytes(&frame.encode());
    }

    /// Queue a well-formed frame. Panics if the payload is too long.
    pub fn push_command(&mut self, command: Command, payload: &[u8]) {
        let frame = Frame::new(command.as_byte(), payload)
            .unwrap_or_else(|e| panic!("cannot build {:?} frame: {}", command, e));
        self.push_frame(&frame);
    }

    /// Unconsumed receive events.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Timeouts passed to each receive, in order.
    pub fn timeouts(&self) -> &[Timeout] {
        &self.timeouts
    }

    pub fn sent(&self) -> &[u8] {
        &self.tx
    }

    pub fn fail_transmit(&mut self, fail: bool) {
        self.fail_transmit = fail;
    }

    /// Decode transmitted bytes as consecutive response frames.
    ///
    /// Stops at the first chunk that is not a valid response.
    pub fn responses(&self) -> Vec<Response> {
        let mut out = Vec::new();
        let mut rest = self.tx.as_slice();

        while rest.len() >= FRAME_OVERHEAD {
            let len = u16::from_le_bytes([rest[2], rest[3]]) as usize + FRAME_OVERHEAD;
            if rest.len() < len {
                break;
            }
            let Ok(frame) = Frame::decode(&rest[..len]) else {
                break;
            };
            let Ok(response) = Response::from_frame(&frame) else {
                break;
            };
            out.push(response);
            rest = &rest[len..];
        }
        out
    }
}

impl SerialLink for MockLink {
    fn receive_byte(&mut self, timeout: Timeout) -> Result<u8, LinkError> {
        self.timeouts.push(timeout);
        match self.rx.pop_front() {
            Some(RxEvent::Byte(b)) => Ok(b),
            Some(RxEvent::Stall) | None => Err(LinkError::Timeout),
        }
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.fail_transmit {
            return Err(LinkError::Io);
        }
        self.tx.extend_from_slice(bytes);
        Ok(())
    }
}
