// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Core of the OTA update engine for the dual-image bootloader.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for embedded targets
//! - `std` feature: Enables `std` support for host tools, plus in-memory mocks
//! - `defmt` feature: Routes diagnostic output through `defmt`
//! - `embedded` feature: Enables board helpers built on `embedded-hal`
//!
//! The update session is split the same way the data flows:
//! [`transport`] pulls framed packets off the serial link, [`session`] drives
//! the START/HEADER/DATA/END protocol, [`writer`] streams image bytes into the
//! spare slot and [`slot_store`] persists the slot table.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod log;

pub mod config;
pub mod crc16;
pub mod error;
pub mod flash;
pub mod frame;
pub mod layout;
pub mod link;
pub mod protocol;
pub mod session;
pub mod slot_store;
pub mod transport;
pub mod writer;

// In-memory collaborators for host tests and tooling
#[cfg(feature = "std")]
pub mod mock;

// Re-export commonly used types
pub use config::{ConfigRecord, SlotEntry, SlotIndex};
pub use crc16::{crc16, Crc16};
pub use error::{ConfigError, FlashError, LinkError, OtaError, ProtocolError, TransportError};
pub use flash::{FlashBackend, FlashGuard};
pub use frame::{Frame, Response};
pub use layout::{FlashLayout, Region};
pub use link::{SerialLink, Timeout};
pub use protocol::{Command, FirmwareKind, ImageHeader, RebootCause};
pub use protocol::{ACK, EOF, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, NACK, PROGRAM_UNIT, SOF};
pub use session::{CrcPolicy, Phase, SessionConfig, SessionContext, SessionOutcome, Updater};
pub use slot_store::SlotStore;

#[cfg(feature = "embedded")]
use embedded_hal::delay::DelayNs;
#[cfg(feature = "embedded")]
use embedded_hal::digital::OutputPin;

/// Blink an LED a specified number of times.
#[cfg(feature = "embedded")]
pub fn blink(led: &mut impl OutputPin, timer: &mut impl DelayNs, count: u32, period_ms: u32) {
    for _ in 0..count {
        led.set_high().ok();
        timer.delay_ms(period_ms);
        led.set_low().ok();
        timer.delay_ms(period_ms);
    }
}
