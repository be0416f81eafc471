use libemu16isa::{
    instruction::{kind::InstructionKind, Instruction},
    Word, IP,
};
use thiserror::Error;

use crate::{
    bootmedia::BootMedia,
    bus::{Bus, BusError},
    memory::{Memory, Segfault},
    Processor,
};

mod parsed;


/// A single instruction's failure. Exactly one fault can arise per
/// instruction; decode itself cannot fail because all 16 opcode patterns
/// are defined.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error(transparent)]
    Memory(#[from] Segfault),

    #[error(transparent)]
    Bus(#[from] BusError),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InstructionFault {
    /// The instruction word itself could not be read. IP is left alone;
    /// there is no width to advance by.
    #[error("Instruction fetch from 0x{ip:04x} faulted: {source}")]
    Fetch {
        ip: Word,
        #[source]
        source: Segfault,
    },

    #[error("{kind} at 0x{ip:04x} faulted: {source}")]
    Execute {
        kind: InstructionKind,
        ip: Word,
        #[source]
        source: Fault,
    },
}

impl<M, B, U> Processor<M, B, U>
where
    M: Memory,
    B: BootMedia,
    U: Bus,
{
    /// Fetches, decodes and executes exactly one instruction, then advances
    /// IP by the instruction's width. The advance happens on the fault path
    /// too, so a faulting instruction cannot wedge the run loop.
    pub fn step(&mut self) -> Result<(), InstructionFault> {
        let ip = self.reg_file.word(IP);

        let instruction_word = self
            .memory
            .load16(ip, 0)
            .map_err(|source| InstructionFault::Fetch { ip, source })?;

        let instruction = Instruction::decode(instruction_word);
        let mut width = instruction.kind.width() as Word;

        let result = self.execute_parsed_instruction(&instruction, ip, &mut width);

        // Taken jumps have already rewritten IP and zeroed the width, so the
        // advance starts from the current IP rather than the fetch address.
        let next_ip = self.reg_file.word(IP).wrapping_add(width);
        self.reg_file.set_word(IP, next_ip);

        result.map_err(|source| InstructionFault::Execute {
            kind: instruction.kind,
            ip,
            source,
        })
    }
}
