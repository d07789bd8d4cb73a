// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use ota_common::{FirmwareKind, MAX_PAYLOAD_SIZE};

use crate::commands;
use crate::transport::{Transport, DEFAULT_TIMEOUT_MS};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "ota-upload")]
#[command(about = "Firmware upload tool for ota-bootloader")]
pub struct Cli {
    /// Serial port (e.g., /dev/ttyUSB0)
    #[arg(short, long)]
    pub port: Option<String>,

    /// Line rate of the bootloader UART
    #[arg(short, long, default_value_t = 115_200)]
    pub baud: u32,

    /// How long to wait for each response, in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

/// Image kind as given on the command line.
#[derive(Clone, Copy, ValueEnum)]
pub enum Kind {
    App,
    Bootloader,
}

impl From<Kind> for FirmwareKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::App => FirmwareKind::Application,
            Kind::Bootloader => FirmwareKind::Bootloader,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Upload a firmware image into the spare slot
    Upload {
        /// Firmware binary file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Which image the file is
        #[arg(short, long, value_enum, default_value = "app")]
        kind: Kind,

        /// Firmware version number
        #[arg(short, long, default_value_t = 1)]
        version: u16,

        /// Bytes per DATA frame (multiple of 8)
        #[arg(short, long, default_value_t = MAX_PAYLOAD_SIZE)]
        chunk_size: usize,
    },

    /// Print size and CRC16 of an image
    Crc {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Decode a dumped configuration sector
    InspectConfig {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of slots in the table
        #[arg(short, long, default_value_t = 1)]
        slots: u8,
    },
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Upload {
            file,
            kind,
            version,
            chunk_size,
        } => {
            commands::validate_chunk_size(chunk_size)?;
            let port = cli.port.context("--port is required for upload")?;
            let mut transport = Transport::open(&port, cli.baud, cli.timeout_ms)?;
            println!("Port:     {} @ {} baud", transport.port_name(), cli.baud);
            transport.drain_rx();
            commands::upload(&mut transport, &file, kind.into(), version, chunk_size)
        }
        Commands::Crc { file } => commands::crc(&file),
        Commands::InspectConfig { file, slots } => commands::inspect_config(&file, slots),
    }
}
