// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! UART serial link with per-byte deadlines on the hardware timer.

use ota_common::{LinkError, SerialLink, Timeout};
use rp2040_hal as hal;

use crate::peripherals::Uart;

pub struct UartLink<'a> {
    uart: &'a mut Uart,
    timer: &'a hal::Timer,
}

impl<'a> UartLink<'a> {
    pub fn new(uart: &'a mut Uart, timer: &'a hal::Timer) -> Self {
        Self { uart, timer }
    }

    /// Microseconds since boot.
    fn now_us(&self) -> u64 {
        self.timer.get_counter().ticks()
    }
}

impl SerialLink for UartLink<'_> {
    fn receive_byte(&mut self, timeout: Timeout) -> Result<u8, LinkError> {
        let deadline = match timeout {
            Timeout::Forever => None,
            Timeout::Millis(ms) => Some(self.now_us() + u64::from(ms) * 1_000),
        };

        while !self.uart.uart_is_readable() {
            if deadline.is_some_and(|d| self.now_us() >= d) {
                return Err(LinkError::Timeout);
            }
            core::hint::spin_loop();
        }

        let mut byte = [0u8; 1];
        self.uart
            .read_full_blocking(&mut byte)
            .map_err(|_| LinkError::Io)?;
        Ok(byte[0])
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.uart.write_full_blocking(bytes);
        Ok(())
    }
}
