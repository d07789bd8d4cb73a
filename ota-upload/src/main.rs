// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Firmware upload tool for ota-bootloader over a serial port.
//!
//! Usage:
//!   ota-upload --port /dev/ttyUSB0 upload firmware.bin --kind app --version 2
//!   ota-upload crc firmware.bin
//!   ota-upload inspect-config config.bin --slots 1

mod cli;
mod commands;
mod transport;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args)
}
