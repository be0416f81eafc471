use std::fmt::Display;

use bimap::BiMap;
use lazy_static::lazy_static;

lazy_static! {
    static ref KIND_OPCODE_BIMAP: BiMap<InstructionKind, u8> = BiMap::from_iter([
        (InstructionKind::Load, 0x0),
        (InstructionKind::Store, 0x1),
        (InstructionKind::Set, 0x2),
        (InstructionKind::WBus, 0x3),
        (InstructionKind::SBus, 0x4),
        (InstructionKind::RBus, 0x5),
        (InstructionKind::LJump, 0x6),
        (InstructionKind::EJump, 0x7),
        (InstructionKind::Add, 0x8),
        (InstructionKind::Sub, 0x9),
        (InstructionKind::Shl, 0xA),
        (InstructionKind::Shr, 0xB),
        (InstructionKind::And, 0xC),
        (InstructionKind::Or, 0xD),
        (InstructionKind::Not, 0xE),
        (InstructionKind::Xor, 0xF),
    ]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionKind {
    Load,
    Store,
    Set,

    WBus,
    SBus,
    RBus,

    LJump,
    EJump,

    Add,
    Sub,
    Shl,
    Shr,
    And,
    Or,
    Not,
    Xor,
}

impl InstructionKind {
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        KIND_OPCODE_BIMAP.get_by_right(&opcode).copied()
    }

    pub fn opcode(&self) -> u8 {
        *KIND_OPCODE_BIMAP
            .get_by_left(self)
            .expect("No opcode mapping for instruction kind")
    }

    /// Bytes this instruction contributes to the IP advance. Taken jumps
    /// override this to zero at execution time.
    pub fn width(&self) -> usize {
        match self {
            // Only the leading opcode + bus-driver byte is consumed.
            Self::WBus | Self::SBus | Self::RBus => 1,
            Self::Set => 3,
            _ => 2,
        }
    }

    pub fn has_immediate(&self) -> bool {
        match self {
            Self::Set => true,
            _ => false,
        }
    }
}

impl Display for InstructionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Store => "store",
            Self::Set => "set",
            Self::WBus => "wbus",
            Self::SBus => "sbus",
            Self::RBus => "rbus",
            Self::LJump => "ljump",
            Self::EJump => "ejump",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Shl => "shl",
            Self::Shr => "shr",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "not",
            Self::Xor => "xor",
        })
    }
}
