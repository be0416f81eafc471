use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use libemu16isa::{Word, IP};
use thiserror::Error;
use tracing::{debug, warn};

use bootmedia::{BootMedia, OutOfMedia};
use bus::{Bus, Interrupt};
use execute::InstructionFault;
use memory::{Memory, Segfault};
use regfile::RegFile;

pub mod bootmedia;
pub mod bus;
pub mod execute;
pub mod memory;
pub mod regfile;

pub const DEFAULT_MEMORY_SIZE: usize = 16 * 1024;
pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    #[error("Failed to load byte 0x{addr:04x} from boot media")]
    Media {
        addr: Word,
        #[source]
        source: OutOfMedia,
    },

    #[error("Failed to save boot byte 0x{data:02x} to memory at 0x{addr:04x} + offset 0x{offset:04x}")]
    Memory {
        addr: Word,
        offset: Word,
        data: u8,
        #[source]
        source: Segfault,
    },
}

/// The machine core: sixteen registers over borrowed-in memory, boot media
/// and bus capabilities, plus the tick/interrupt pair gating the run loop.
pub struct Processor<M, B, U> {
    pub reg_file: RegFile,
    pub memory: M,
    boot_media: B,
    bus: U,
    ticker: Receiver<Instant>,
    interrupts: Receiver<Interrupt>,
}

impl<M, B, U> Processor<M, B, U>
where
    M: Memory,
    B: BootMedia,
    U: Bus,
{
    /// Wires the processor up and installs its interrupt sink into the bus.
    pub fn new(memory: M, boot_media: B, mut bus: U, ticker: Receiver<Instant>) -> Self {
        let (interrupt_sink, interrupts) = bounded(1);
        bus.install_interrupt_sink(interrupt_sink);

        Self {
            reg_file: RegFile::new(),
            memory,
            boot_media,
            bus,
            ticker,
            interrupts,
        }
    }

    /// Copies the boot image into memory and points IP at its entry point.
    /// Failures here are fatal; a machine that cannot boot has nothing to
    /// fall back to.
    pub fn boot(&mut self) -> Result<(), BootError> {
        let offset = self.boot_media.offset();
        let length = self.boot_media.length();

        for addr in 0..length {
            let data = self
                .boot_media
                .load(addr)
                .map_err(|source| BootError::Media { addr, source })?;

            self.memory
                .save8(addr, offset, data)
                .map_err(|source| BootError::Memory {
                    addr,
                    offset,
                    data,
                    source,
                })?;
        }

        let initial_ip = self.boot_media.initial_ip();
        self.reg_file.set_word(IP, initial_ip);

        debug!(offset, length, initial_ip, "boot copy complete");
        Ok(())
    }

    /// Executes instructions at the tick cadence until an interrupt arrives
    /// (or the interrupt channel closes, which terminates the same way).
    /// Faults are published on `faults` and execution continues; if the far
    /// end of `faults` is gone there is nobody left to run for.
    pub fn run(&mut self, faults: &Sender<InstructionFault>) {
        loop {
            if let Err(fault) = self.step() {
                warn!(%fault, "instruction fault");

                if faults.send(fault).is_err() {
                    return;
                }
            }

            select! {
                recv(self.ticker) -> _ => {}
                recv(self.interrupts) -> interrupt => {
                    debug!(?interrupt, "run loop interrupted");
                    return;
                }
            }
        }
    }
}
