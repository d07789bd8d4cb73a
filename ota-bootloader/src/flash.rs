// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Flash backend over the RP2040 boot-ROM routines.
//!
//! On RP2040, flash operations (erase/program) require disabling XIP first.
//! The full sequence is:
//!   1. connect_internal_flash()
//!   2. flash_exit_xip()
//!   3. flash_range_erase() or flash_range_program()
//!   4. flash_flush_cache()
//!   5. flash_enter_cmd_xip()
//!
//! All code executing during steps 1-5 must run from RAM, not flash.
//! We use `#[link_section = ".data"]` to place critical functions in RAM,
//! and pre-resolve all ROM function pointers when the backend is created.

use ota_common::layout::{FLASH_BASE, FLASH_PAGE_SIZE, FLASH_SECTOR_SIZE};
use ota_common::{FlashBackend, FlashError, Region, PROGRAM_UNIT};

// ROM function pointer types
type RomFnVoid = unsafe extern "C" fn();
type RomFnErase = unsafe extern "C" fn(u32, usize, u32, u8);
type RomFnProgram = unsafe extern "C" fn(u32, *const u8, usize);

/// ROM function pointers, resolved once from the ROM table.
/// Stored in static RAM so RAM-resident functions can call them without
/// accessing flash-based code.
static mut ROM_CONNECT_INTERNAL_FLASH: RomFnVoid = dummy_void;
static mut ROM_FLASH_EXIT_XIP: RomFnVoid = dummy_void;
static mut ROM_FLASH_RANGE_ERASE: RomFnErase = dummy_erase;
static mut ROM_FLASH_RANGE_PROGRAM: RomFnProgram = dummy_program;
static mut ROM_FLASH_FLUSH_CACHE: RomFnVoid = dummy_void;
static mut ROM_FLASH_ENTER_CMD_XIP: RomFnVoid = dummy_void;

unsafe extern "C" fn dummy_void() {}
unsafe extern "C" fn dummy_erase(_: u32, _: usize, _: u32, _: u8) {}
unsafe extern "C" fn dummy_program(_: u32, _: *const u8, _: usize) {}

// 4KB sector erase command for flash_range_erase
const SECTOR_ERASE_CMD: u8 = 0x20;

/// Look up a ROM function by its two-character tag.
/// ROM table pointer at 0x14 and lookup function at 0x18 are 16-bit halfword pointers.
unsafe fn rom_func_lookup(tag: &[u8; 2]) -> usize {
    let fn_table = *(0x14 as *const u16) as *const u16;
    let lookup: unsafe extern "C" fn(*const u16, u32) -> usize =
        core::mem::transmute::<usize, unsafe extern "C" fn(*const u16, u32) -> usize>(
            *(0x18 as *const u16) as usize,
        );
    let code = u16::from_le_bytes(*tag) as u32;
    lookup(fn_table, code)
}

/// Resolve the ROM flash routines. Requires XIP to be active.
fn init_rom_functions() {
    unsafe {
        ROM_CONNECT_INTERNAL_FLASH =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"IF"));
        ROM_FLASH_EXIT_XIP = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"EX"));
        ROM_FLASH_RANGE_ERASE =
            core::mem::transmute::<usize, RomFnErase>(rom_func_lookup(b"RE"));
        ROM_FLASH_RANGE_PROGRAM =
            core::mem::transmute::<usize, RomFnProgram>(rom_func_lookup(b"RP"));
        ROM_FLASH_FLUSH_CACHE = core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"FC"));
        ROM_FLASH_ENTER_CMD_XIP =
            core::mem::transmute::<usize, RomFnVoid>(rom_func_lookup(b"CX"));
    }
}

/// Erase flash at the given flash-relative offset.
/// Runs entirely from RAM with interrupts masked.
///
/// # Safety
/// ROM functions must have been resolved.
#[link_section = ".data"]
#[inline(never)]
unsafe fn rom_erase(offset: u32, size: u32) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_ERASE(offset, size as usize, FLASH_SECTOR_SIZE, SECTOR_ERASE_CMD);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Program one 256-byte page at the given flash-relative offset.
/// Runs entirely from RAM with interrupts masked.
///
/// # Safety
/// ROM functions must have been resolved; `data` must point to `len` bytes.
#[link_section = ".data"]
#[inline(never)]
unsafe fn rom_program(offset: u32, data: *const u8, len: usize) {
    cortex_m::interrupt::disable();
    ROM_CONNECT_INTERNAL_FLASH();
    ROM_FLASH_EXIT_XIP();
    ROM_FLASH_RANGE_PROGRAM(offset, data, len);
    ROM_FLASH_FLUSH_CACHE();
    ROM_FLASH_ENTER_CMD_XIP();
    cortex_m::interrupt::enable();
}

/// Whether `len` bytes at the absolute address lie inside the XIP flash window.
fn in_flash(address: u32, len: u32) -> bool {
    const XIP_WINDOW_END: u32 = FLASH_BASE + 0x0100_0000;
    address >= FLASH_BASE
        && address
            .checked_add(len)
            .is_some_and(|end| end <= XIP_WINDOW_END)
}

/// On-chip QSPI flash driven through the boot ROM.
///
/// The ROM has no write protection of its own; erase and program are
/// refused with [`FlashError::Locked`] outside an unlock/lock bracket.
pub struct RomFlash {
    unlocked: bool,
}

impl RomFlash {
    /// Resolve the ROM routines. Call once, while XIP is active.
    pub fn new() -> Self {
        init_rom_functions();
        Self { unlocked: false }
    }
}

impl FlashBackend for RomFlash {
    fn unlock(&mut self) -> Result<(), FlashError> {
        self.unlocked = true;
        Ok(())
    }

    fn lock(&mut self) -> Result<(), FlashError> {
        self.unlocked = false;
        Ok(())
    }

    fn erase(&mut self, region: Region) -> Result<(), FlashError> {
        if !self.unlocked {
            return Err(FlashError::Locked);
        }
        if !in_flash(region.start, region.len())
            || region.start % FLASH_SECTOR_SIZE != 0
            || region.len() % FLASH_SECTOR_SIZE != 0
        {
            return Err(FlashError::Erase {
                address: region.start,
            });
        }

        unsafe { rom_erase(region.start - FLASH_BASE, region.len()) };
        Ok(())
    }

    fn program_unit(&mut self, address: u32, unit: &[u8; PROGRAM_UNIT]) -> Result<(), FlashError> {
        if !self.unlocked {
            return Err(FlashError::Locked);
        }
        if address % PROGRAM_UNIT as u32 != 0 {
            return Err(FlashError::Misaligned { address });
        }
        if !in_flash(address, PROGRAM_UNIT as u32) {
            return Err(FlashError::Program { address });
        }

        // Bits left at 1 are not changed by programming, so the rest of the
        // page keeps its contents.
        let page_addr = address & !(FLASH_PAGE_SIZE - 1);
        let at = (address - page_addr) as usize;
        let mut page = [0xFFu8; FLASH_PAGE_SIZE as usize];
        page[at..at + PROGRAM_UNIT].copy_from_slice(unit);

        unsafe { rom_program(page_addr - FLASH_BASE, page.as_ptr(), page.len()) };
        Ok(())
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<(), FlashError> {
        if !in_flash(address, buf.len() as u32) {
            return Err(FlashError::Read { address });
        }
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = unsafe { ((address + i as u32) as *const u8).read_volatile() };
        }
        Ok(())
    }
}
