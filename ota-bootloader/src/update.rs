// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update mode: run sessions over UART until one commits, then reset.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use ota_common::{FlashLayout, SessionConfig, Updater};

use crate::flash::RomFlash;
use crate::peripherals::Peripherals;
use crate::uart_link::UartLink;

pub fn enter_update_mode(p: &mut Peripherals, flash: &mut RomFlash) -> ! {
    defmt::println!("Update mode requested");

    ota_common::blink(&mut p.led_pin, &mut p.timer, 10, 50);
    p.led_pin.set_high().ok();

    let mut updater = Updater::new(flash, FlashLayout::RP2040, SessionConfig::default());

    loop {
        let result = {
            let mut link = UartLink::new(&mut p.uart, &p.timer);
            updater.run(&mut link)
        };

        match result {
            Ok(outcome) => {
                defmt::info!(
                    "Image v{} ({} bytes) committed to slot {}, crc ok: {}",
                    outcome.header.version,
                    outcome.header.total_size,
                    outcome.slot.get(),
                    outcome.crc_matched
                );
                // Let the final ACK drain
                p.timer.delay_ms(100u32);
                cortex_m::peripheral::SCB::sys_reset();
            }
            Err(e) => {
                defmt::warn!("Update session failed: {}, waiting for a new one", e);
            }
        }
    }
}
