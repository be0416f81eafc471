use libemu16isa::{
    instruction::{kind::InstructionKind, Instruction},
    Register, Word, IP,
};

use crate::{bootmedia::BootMedia, bus::Bus, memory::Memory, Processor};

use super::Fault;

impl<M, B, U> Processor<M, B, U>
where
    M: Memory,
    B: BootMedia,
    U: Bus,
{
    pub(super) fn execute_parsed_instruction(
        &mut self,
        instruction: &Instruction,
        ip: Word,
        width: &mut Word,
    ) -> Result<(), Fault> {
        match instruction.kind {
            // arg3 selects the access size: non-zero loads a single byte
            // into the Low half, zero loads a full word.
            InstructionKind::Load => {
                let base = self.reg_file.word(instruction.reg_b);

                if instruction.reg_c != 0 {
                    let data = self.memory.load8(base, 0)?;
                    self.reg_file.set_low(instruction.reg_a, data);
                } else {
                    let data = self.memory.load16(base, 0)?;
                    self.reg_file.set_word(instruction.reg_a, data);
                }
            }

            InstructionKind::Store => {
                let base = self.reg_file.word(instruction.reg_b);

                if instruction.reg_c != 0 {
                    self.memory
                        .save8(base, 0, self.reg_file.low(instruction.reg_a))?;
                } else {
                    self.memory
                        .save16(base, 0, self.reg_file.word(instruction.reg_a))?;
                }
            }

            InstructionKind::Set => {
                let data = self.memory.load16(ip, 1)?;
                self.reg_file.set_word(instruction.reg_a, data);
            }

            InstructionKind::WBus => {
                let data_reg = self.data_register(instruction.reg_a);

                match self.bus.which() {
                    Ok(addr) => {
                        self.reg_file.set_low(data_reg, addr);
                        self.reg_file.set_high(data_reg, 0x00);
                    }

                    // No data anywhere is an in-band signal to the program,
                    // not a fault: High 1, Low 0.
                    Err(_) => {
                        self.reg_file.set_low(data_reg, 0x00);
                        self.reg_file.set_high(data_reg, 0x01);
                    }
                }
            }

            InstructionKind::SBus => {
                let addr = self.reg_file.high(instruction.reg_a);
                let data_reg = self.data_register(instruction.reg_a);

                self.bus.send(addr, self.reg_file.word(data_reg))?;
            }

            InstructionKind::RBus => {
                let addr = self.reg_file.high(instruction.reg_a);
                let data_reg = self.data_register(instruction.reg_a);

                let data = self.bus.recv(addr)?;
                self.reg_file.set_word(data_reg, data);
            }

            InstructionKind::LJump => {
                if self.reg_file.word(instruction.reg_a) < self.reg_file.word(instruction.reg_b) {
                    self.take_jump(instruction.reg_c, width);
                }
            }

            InstructionKind::EJump => {
                if self.reg_file.word(instruction.reg_a) == self.reg_file.word(instruction.reg_b) {
                    self.take_jump(instruction.reg_c, width);
                }
            }

            InstructionKind::Add => {
                let data = self
                    .reg_file
                    .word(instruction.reg_b)
                    .wrapping_add(self.reg_file.word(instruction.reg_c));

                self.reg_file.set_word(instruction.reg_a, data);
            }

            InstructionKind::Sub => {
                let data = self
                    .reg_file
                    .word(instruction.reg_b)
                    .wrapping_sub(self.reg_file.word(instruction.reg_c));

                self.reg_file.set_word(instruction.reg_a, data);
            }

            // Shift amounts are the full 16-bit register value; anything
            // past the word width shifts every bit out.
            InstructionKind::Shl => {
                let amount = self.reg_file.word(instruction.reg_c) as u32;
                let data = self
                    .reg_file
                    .word(instruction.reg_b)
                    .checked_shl(amount)
                    .unwrap_or(0);

                self.reg_file.set_word(instruction.reg_a, data);
            }

            InstructionKind::Shr => {
                let amount = self.reg_file.word(instruction.reg_c) as u32;
                let data = self
                    .reg_file
                    .word(instruction.reg_b)
                    .checked_shr(amount)
                    .unwrap_or(0);

                self.reg_file.set_word(instruction.reg_a, data);
            }

            InstructionKind::And => {
                let data =
                    self.reg_file.word(instruction.reg_b) & self.reg_file.word(instruction.reg_c);

                self.reg_file.set_word(instruction.reg_a, data);
            }

            InstructionKind::Or => {
                let data =
                    self.reg_file.word(instruction.reg_b) | self.reg_file.word(instruction.reg_c);

                self.reg_file.set_word(instruction.reg_a, data);
            }

            // Complement of arg2; arg3 takes no part in it.
            InstructionKind::Not => {
                let data = self.reg_file.word(instruction.reg_b) ^ 0xFFFF;

                self.reg_file.set_word(instruction.reg_a, data);
            }

            InstructionKind::Xor => {
                let data =
                    self.reg_file.word(instruction.reg_b) ^ self.reg_file.word(instruction.reg_c);

                self.reg_file.set_word(instruction.reg_a, data);
            }
        }

        Ok(())
    }

    /// The register named by the Low byte of a bus-driver register.
    fn data_register(&self, driver: Register) -> Register {
        self.reg_file.low(driver) as Register
    }

    fn take_jump(&mut self, target: Register, width: &mut Word) {
        let destination = self.reg_file.word(target);
        self.reg_file.set_word(IP, destination);

        // The jump has placed IP itself; the central advance must not move
        // past it.
        *width = 0;
    }
}
