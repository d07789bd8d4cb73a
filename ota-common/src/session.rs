// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Update session state machine.
//!
//! ```text
//! Idle -> Started -START-> HeaderReceived -HEADER-> ReceivingData -DATA..-> Completed -END-> Idle
//! ```
//!
//! [`Updater::step`] applies one frame to a [`SessionContext`]. A step either
//! advances the phase or fails and leaves the phase untouched; there is no
//! partial progress. [`Updater::run`] is the outer loop: one ACK or NACK per
//! frame, stopping at the first failure or once the image is committed.

use crate::config::SlotIndex;
use crate::error::{OtaError, ProtocolError};
use crate::flash::{compute_crc16, FlashBackend};
use crate::frame::{Frame, Response};
use crate::layout::{FlashLayout, Region};
use crate::link::SerialLink;
use crate::protocol::{Command, ImageHeader, DEFAULT_BYTE_TIMEOUT_MS, PROGRAM_UNIT};
use crate::slot_store::SlotStore;
use crate::transport::{receive_frame, send_response};
use crate::writer::FlashWriter;

/// What to do when the written image does not match the announced CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrcPolicy {
    /// Log the mismatch and commit anyway.
    #[default]
    LogOnly,
    /// Fail the END step and leave the slot invalid.
    Enforce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionConfig {
    /// Per-byte receive timeout once a frame has started.
    pub byte_timeout_ms: u32,
    pub image_crc: CrcPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            byte_timeout_ms: DEFAULT_BYTE_TIMEOUT_MS,
            image_crc: CrcPolicy::LogOnly,
        }
    }
}

/// An image transfer in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transfer {
    pub header: ImageHeader,
    /// Slot-table entry the image is recorded in. Fixed once chosen.
    pub slot: SlotIndex,
    /// Image bytes written so far. Never exceeds `header.total_size`.
    pub received: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Idle,
    Started,
    HeaderReceived,
    ReceivingData(Transfer),
    Completed(Transfer),
}

impl Phase {
    /// Command that advances this phase. `None` while idle.
    pub fn expected_command(&self) -> Option<Command> {
        match self {
            Phase::Idle => None,
            Phase::Started => Some(Command::Start),
            Phase::HeaderReceived => Some(Command::Header),
            Phase::ReceivingData(_) => Some(Command::FwData),
            Phase::Completed(_) => Some(Command::End),
        }
    }
}

/// Transient state of one session, owned by the update loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionContext {
    phase: Phase,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    /// Enter the session: the next frame must be START.
    pub fn begin(&mut self) {
        self.phase = Phase::Started;
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn transfer(&self) -> Option<&Transfer> {
        match &self.phase {
            Phase::ReceivingData(t) | Phase::Completed(t) => Some(t),
            _ => None,
        }
    }

    pub fn bytes_received(&self) -> u32 {
        self.transfer().map_or(0, |t| t.received)
    }
}

/// Result of a committed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionOutcome {
    pub slot: SlotIndex,
    pub header: ImageHeader,
    /// Whether the written image matched the announced CRC.
    pub crc_matched: bool,
}

/// Drives update sessions against one flash device.
pub struct Updater<'f, F: FlashBackend + ?Sized> {
    flash: &'f mut F,
    store: SlotStore,
    config: SessionConfig,
}

impl<'f, F: FlashBackend + ?Sized> Updater<'f, F> {
    pub fn new(flash: &'f mut F, layout: FlashLayout, config: SessionConfig) -> Self {
        Self {
            flash,
            store: SlotStore::new(layout),
            config,
        }
    }

    pub fn flash(&mut self) -> &mut F {
        &mut *self.flash
    }

    /// Run one complete session over `link`.
    ///
    /// Returns once the image is committed, or with the error of the first
    /// failing step after NACKing it.
    pub fn run<L: SerialLink + ?Sized>(&mut self, link: &mut L) -> Result<SessionOutcome, OtaError> {
        let mut ctx = SessionContext::new();
        ctx.begin();
        info!("Update session started");

        loop {
            let frame = match receive_frame(link, self.config.byte_timeout_ms) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Frame rejected: {}", e);
                    if let Err(nack_err) = send_response(link, Response::nack(0)) {
                        warn!("NACK not sent: {}", nack_err);
                    }
                    return Err(e.into());
                }
            };

            let command = frame.command_byte();
            match self.step(&mut ctx, &frame) {
                Ok(outcome) => {
                    send_response(link, Response::ack(command))?;
                    if let Some(outcome) = outcome {
                        info!("Update session complete");
                        return Ok(outcome);
                    }
                }
                Err(e) => {
                    error!("NACK command {}: {}", command, e);
                    if let Err(nack_err) = send_response(link, Response::nack(command)) {
                        warn!("NACK not sent: {}", nack_err);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Apply one frame to the session.
    ///
    /// On failure the phase is left unchanged. Returns the outcome when the
    /// frame committed the image.
    pub fn step(
        &mut self,
        ctx: &mut SessionContext,
        frame: &Frame,
    ) -> Result<Option<SessionOutcome>, OtaError> {
        // Stray input outside a session is absorbed
        let Some(expected) = ctx.phase.expected_command() else {
            return Ok(None);
        };

        let command = frame.command()?;
        debug!("Received command {}", command.as_byte());

        if command == Command::Abort {
            warn!("Session aborted by host");
            return Err(ProtocolError::Aborted.into());
        }
        if command != expected {
            return Err(ProtocolError::UnexpectedCommand {
                expected,
                received: command,
            }
            .into());
        }

        let next = match ctx.phase {
            Phase::Idle => return Ok(None),
            Phase::Started => Phase::HeaderReceived,
            Phase::HeaderReceived => self.on_header(frame.payload())?,
            Phase::ReceivingData(transfer) => self.on_data(transfer, frame.payload())?,
            Phase::Completed(transfer) => {
                let outcome = self.on_end(transfer)?;
                ctx.phase = Phase::Idle;
                return Ok(Some(outcome));
            }
        };

        ctx.phase = next;
        Ok(None)
    }

    fn staging_region(&self, header: &ImageHeader) -> Region {
        self.store.layout().staging_region(header.kind)
    }

    fn on_header(&mut self, payload: &[u8]) -> Result<Phase, OtaError> {
        let header = ImageHeader::decode(payload)?;
        if !self.staging_region(&header).fits(0, header.total_size) {
            return Err(ProtocolError::InvalidHeader.into());
        }

        info!(
            "Image header: size {} kind {} crc {:#x} version {}",
            header.total_size,
            header.kind as u8,
            header.crc,
            header.version
        );

        let slot = self.store.select_available_slot(&mut *self.flash)?;
        info!("Selected slot {}", slot.get());

        Ok(Phase::ReceivingData(Transfer {
            header,
            slot,
            received: 0,
        }))
    }

    fn on_data(&mut self, transfer: Transfer, payload: &[u8]) -> Result<Phase, OtaError> {
        let total = transfer.header.total_size;
        let chunk = payload.len() as u32;
        let remaining = total - transfer.received;

        if chunk == 0 {
            return Err(ProtocolError::EmptyChunk.into());
        }
        if chunk > remaining {
            return Err(ProtocolError::ChunkOverrun {
                received: transfer.received,
                chunk: chunk as u16,
                total,
            }
            .into());
        }
        if chunk < remaining && chunk % PROGRAM_UNIT as u32 != 0 {
            return Err(ProtocolError::UnalignedChunk { chunk: chunk as u16 }.into());
        }

        let is_first_chunk = transfer.received == 0;
        if is_first_chunk {
            // The slot must never look bootable while its image is rewritten
            self.store.invalidate(&mut *self.flash, transfer.slot)?;
        }

        let writer = FlashWriter::new(self.staging_region(&transfer.header));
        let received = writer.write_chunk(&mut *self.flash, transfer.received, payload, is_first_chunk)?;
        debug!("Received {} of {} bytes", received, total);

        let transfer = Transfer {
            received,
            ..transfer
        };
        if received >= total {
            Ok(Phase::Completed(transfer))
        } else {
            Ok(Phase::ReceivingData(transfer))
        }
    }

    fn on_end(&mut self, transfer: Transfer) -> Result<SessionOutcome, OtaError> {
        let header = transfer.header;
        let region = self.staging_region(&header);
        let computed = compute_crc16(&mut *self.flash, region.start, header.total_size)?;
        let crc_matched = computed == header.crc;

        if !crc_matched {
            error!(
                "Image CRC mismatch: expected {:#x}, computed {:#x}",
                header.crc,
                computed
            );
            if self.config.image_crc == CrcPolicy::Enforce {
                return Err(ProtocolError::ImageCrcMismatch {
                    expected: header.crc,
                    computed,
                }
                .into());
            }
        }

        self.store
            .commit(&mut *self.flash, transfer.slot, header.total_size, header.crc, header.version)?;
        info!("Committed slot {} version {}", transfer.slot.get(), header.version);

        Ok(SessionOutcome {
            slot: transfer.slot,
            header,
            crc_matched,
        })
    }
}
