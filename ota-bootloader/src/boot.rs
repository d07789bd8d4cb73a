// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot decision and hand-off to the active application.

use embedded_hal::delay::DelayNs;
use ota_common::{FlashBackend, FlashLayout, RebootCause, Region, SlotStore};

use crate::peripherals::Peripherals;

/// SRAM window a valid initial stack pointer must fall in (end inclusive).
const RAM_START: u32 = 0x2000_0000;
const RAM_END: u32 = 0x2004_2000;

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    fn read_from<F: FlashBackend>(flash: &mut F, addr: u32) -> Option<Self> {
        let mut words = [0u8; 8];
        flash.read(addr, &mut words).ok()?;
        Some(Self {
            initial_sp: u32::from_le_bytes([words[0], words[1], words[2], words[3]]),
            reset_vector: u32::from_le_bytes([words[4], words[5], words[6], words[7]]),
        })
    }

    /// Stack in SRAM, Thumb reset handler inside the image region.
    fn is_plausible(&self, region: Region) -> bool {
        (RAM_START..=RAM_END).contains(&self.initial_sp)
            && self.reset_vector & 1 == 1
            && region.contains(self.reset_vector & !1)
    }
}

/// Decide whether to stay in the bootloader and run an update session.
pub fn update_requested<F: FlashBackend>(gp2_is_low: bool, flash: &mut F) -> bool {
    if gp2_is_low {
        defmt::info!("Update requested by GP2");
        return true;
    }

    let layout = FlashLayout::RP2040;
    let record = match SlotStore::new(layout).load(flash) {
        Ok(record) => record,
        Err(e) => {
            defmt::warn!("Config record unreadable ({}), entering update mode", e);
            return true;
        }
    };

    match record.reboot_cause {
        RebootCause::FirstBoot => {
            defmt::info!("First boot, entering update mode");
            return true;
        }
        RebootCause::OtaRequested => {
            defmt::info!("Update requested by application");
            return true;
        }
        RebootCause::LoadPrevious => {
            defmt::warn!("Previous image requested, booting active application");
        }
        RebootCause::NormalBoot => {}
    }

    if let Some(slot) = record.pending_slot() {
        defmt::info!("Slot {} pending boot", slot.get());
    }

    let app = layout.active_application;
    match VectorTable::read_from(flash, app.start) {
        Some(vt) if vt.is_plausible(app) => false,
        _ => {
            defmt::warn!("No bootable application at {:#x}", app.start);
            true
        }
    }
}

/// Hand off to the application in the active region.
pub fn run_normal_boot(p: &mut Peripherals) -> ! {
    let app = FlashLayout::RP2040.active_application.start;
    defmt::info!("Jumping to application at {:#x}", app);
    p.timer.delay_ms(10u32);

    unsafe {
        prepare_for_firmware_handoff();
        relocate_vector_table(app);
        let initial_sp = (app as *const u32).read_volatile();
        let reset_vector = (app as *const u32).offset(1).read_volatile();
        jump_to_firmware(initial_sp, reset_vector)
    }
}

unsafe fn prepare_for_firmware_handoff() {
    cortex_m::interrupt::disable();

    // Clear pending, then disable all NVIC interrupts
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);
}

unsafe fn relocate_vector_table(base: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(base);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump_to_firmware(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
