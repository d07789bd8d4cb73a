// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations for bootloader operations.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use ota_common::protocol::DEFAULT_BYTE_TIMEOUT_MS;
use ota_common::transport::{receive_frame, send_frame};
use ota_common::{
    crc16, Command, ConfigRecord, FirmwareKind, Frame, ImageHeader, Response, SerialLink,
    MAX_PAYLOAD_SIZE, PROGRAM_UNIT,
};

/// START payload.
const START_REQUEST: u8 = 0x01;

/// Check a DATA chunk size: non-final chunks must be whole program units.
pub fn validate_chunk_size(chunk_size: usize) -> Result<()> {
    if chunk_size == 0 || chunk_size > MAX_PAYLOAD_SIZE {
        bail!(
            "chunk size {} out of range (1..={})",
            chunk_size,
            MAX_PAYLOAD_SIZE
        );
    }
    if chunk_size % PROGRAM_UNIT != 0 {
        bail!(
            "chunk size {} is not a multiple of {}",
            chunk_size,
            PROGRAM_UNIT
        );
    }
    Ok(())
}

/// Send one command frame and wait for its ACK.
fn exchange<L: SerialLink + ?Sized>(
    link: &mut L,
    command: Command,
    payload: &[u8],
    step: &str,
) -> Result<()> {
    let frame = Frame::new(command.as_byte(), payload)
        .with_context(|| format!("{}: cannot build frame", step))?;
    send_frame(link, &frame).with_context(|| format!("{}: send failed", step))?;

    let reply = receive_frame(link, DEFAULT_BYTE_TIMEOUT_MS)
        .with_context(|| format!("{}: no valid response", step))?;
    let response =
        Response::from_frame(&reply).with_context(|| format!("{}: bad response", step))?;

    if response.command != command.as_byte() {
        bail!(
            "{}: response echoes command {}, expected {}",
            step,
            response.command,
            command.as_byte()
        );
    }
    if !response.is_ack() {
        bail!("{} rejected by bootloader (NACK)", step);
    }
    Ok(())
}

/// Run a full START/HEADER/DATA/END session for `image`.
pub fn send_image<L: SerialLink + ?Sized>(
    link: &mut L,
    image: &[u8],
    kind: FirmwareKind,
    version: u16,
    chunk_size: usize,
) -> Result<()> {
    validate_chunk_size(chunk_size)?;
    if image.is_empty() {
        bail!("image is empty");
    }
    let total_size = u32::try_from(image.len()).context("image larger than 4 GiB")?;

    let header = ImageHeader {
        total_size,
        kind,
        crc: crc16(image),
        version,
    };

    print!("Starting session... ");
    std::io::stdout().flush()?;
    exchange(link, Command::Start, &[START_REQUEST], "START")?;
    println!("OK");

    print!("Sending header... ");
    std::io::stdout().flush()?;
    exchange(link, Command::Header, &header.encode(), "HEADER")?;
    println!("OK");

    let pb = ProgressBar::new(total_size as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut offset = 0u64;
    for chunk in image.chunks(chunk_size) {
        if let Err(e) = exchange(link, Command::FwData, chunk, "DATA") {
            pb.abandon();
            return Err(e.context(format!("at offset {}", offset)));
        }
        offset += chunk.len() as u64;
        pb.set_position(offset);
    }
    pb.finish_with_message("Upload complete");
    println!();

    print!("Finalizing... ");
    std::io::stdout().flush()?;
    exchange(link, Command::End, &[], "END")?;
    println!("OK");

    Ok(())
}

/// Upload a firmware file.
pub fn upload<L: SerialLink + ?Sized>(
    link: &mut L,
    file: &Path,
    kind: FirmwareKind,
    version: u16,
    chunk_size: usize,
) -> Result<()> {
    let firmware = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    println!(
        "Firmware: {} ({} bytes, CRC16: 0x{:04x})",
        file.display(),
        firmware.len(),
        crc16(&firmware)
    );
    println!("Kind:     {:?}", kind);
    println!("Version:  {}", version);
    println!();

    send_image(link, &firmware, kind, version, chunk_size)?;

    println!();
    println!("Update committed. The device resets into the bootloader's boot path.");
    Ok(())
}

/// Print size and CRC16 of an image as a HEADER would announce them.
pub fn crc(file: &Path) -> Result<()> {
    let firmware = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    println!("Size:  {} bytes", firmware.len());
    println!("CRC16: 0x{:04x}", crc16(&firmware));
    Ok(())
}

/// Decode a dumped configuration sector.
pub fn inspect_config(file: &Path, slots: u8) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let record = ConfigRecord::deserialize(&bytes, slots)
        .with_context(|| format!("Failed to decode {}", file.display()))?;

    println!(
        "Reboot cause: {:?} (0x{:08x})",
        record.reboot_cause,
        record.reboot_cause.as_word()
    );
    for (i, entry) in record.slots().iter().enumerate() {
        println!("Slot {}:", i);
        println!("  valid:        {}", entry.valid);
        println!("  active:       {}", entry.active);
        println!("  pending boot: {}", entry.pending_boot);
        println!("  new firmware: {}", entry.new_firmware);
        println!("  size:         {}", entry.size);
        println!("  crc:          0x{:04x}", entry.crc);
        println!("  version:      {}", entry.version);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ota_common::mock::MockLink;

    fn ack(command: Command) -> Frame {
        Response::ack(command.as_byte()).to_frame()
    }

    /// Parse everything the tool transmitted back into frames.
    fn sent_frames(link: &MockLink) -> Vec<Frame> {
        let mut replay = MockLink::new();
        replay.push_bytes(link.sent());
        let mut frames = Vec::new();
        while replay.pending() > 0 {
            frames.push(receive_frame(&mut replay, DEFAULT_BYTE_TIMEOUT_MS).unwrap());
        }
        frames
    }

    #[test]
    fn test_chunk_size_limits() {
        assert!(validate_chunk_size(128).is_ok());
        assert!(validate_chunk_size(8).is_ok());
        assert!(validate_chunk_size(0).is_err());
        assert!(validate_chunk_size(136).is_err());
        assert!(validate_chunk_size(100).is_err());
    }

    #[test]
    fn test_send_image_frame_sequence() {
        let image: Vec<u8> = (0..200u32).map(|i| i as u8).collect();
        let mut link = MockLink::new();
        link.push_frame(&ack(Command::Start));
        link.push_frame(&ack(Command::Header));
        link.push_frame(&ack(Command::FwData));
        link.push_frame(&ack(Command::FwData));
        link.push_frame(&ack(Command::End));

        send_image(&mut link, &image, FirmwareKind::Application, 3, 128).unwrap();

        let frames = sent_frames(&link);
        let commands: Vec<u8> = frames.iter().map(|f| f.command_byte()).collect();
        assert_eq!(commands, vec![1, 2, 3, 3, 4]);

        assert_eq!(frames[0].payload(), &[START_REQUEST]);
        let header = ImageHeader::decode(frames[1].payload()).unwrap();
        assert_eq!(header.total_size, 200);
        assert_eq!(header.kind, FirmwareKind::Application);
        assert_eq!(header.crc, crc16(&image));
        assert_eq!(header.version, 3);
        assert_eq!(frames[2].payload(), &image[..128]);
        assert_eq!(frames[3].payload(), &image[128..]);
        assert!(frames[4].payload().is_empty());
    }

    #[test]
    fn test_nack_names_the_step() {
        let mut link = MockLink::new();
        link.push_frame(&ack(Command::Start));
        link.push_frame(&Response::nack(Command::Header.as_byte()).to_frame());

        let err = send_image(&mut link, &[0u8; 16], FirmwareKind::Bootloader, 1, 8).unwrap_err();
        assert!(err.to_string().contains("HEADER"));
        // Nothing sent after the rejected step
        assert_eq!(sent_frames(&link).len(), 2);
    }

    #[test]
    fn test_missing_response_is_an_error() {
        let mut link = MockLink::new();
        let err = send_image(&mut link, &[0u8; 8], FirmwareKind::Application, 1, 8).unwrap_err();
        assert!(err.to_string().contains("START"));
    }

    #[test]
    fn test_wrong_echo_is_rejected() {
        let mut link = MockLink::new();
        link.push_frame(&ack(Command::Header));

        let err = send_image(&mut link, &[0u8; 8], FirmwareKind::Application, 1, 8).unwrap_err();
        assert!(err.to_string().contains("expected 1"));
    }

    #[test]
    fn test_empty_image_is_refused_before_sending() {
        let mut link = MockLink::new();
        assert!(send_image(&mut link, &[], FirmwareKind::Application, 1, 8).is_err());
        assert!(link.sent().is_empty());
    }
}
