use libemu16isa::Word;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Load outside of boot media (index 0x{index:04x}, length 0x{length:04x})")]
pub struct OutOfMedia {
    pub index: Word,
    pub length: Word,
}

/// Read-only source of the initial memory image: where to copy it
/// (`offset`), how much to copy (`length`) and where execution starts
/// (`initial_ip`). Consumed once during boot.
pub trait BootMedia {
    fn offset(&self) -> Word;
    fn length(&self) -> Word;
    fn initial_ip(&self) -> Word;
    fn load(&self, index: Word) -> Result<u8, OutOfMedia>;
}

pub struct BootImage {
    data: Vec<u8>,
    offset: Word,
    start: Word,
}

impl BootImage {
    pub fn new(data: Vec<u8>, offset: Word, start: Word) -> Self {
        assert!(data.len() <= Word::MAX as usize, "Boot image is limited to 64 KiB");

        Self { data, offset, start }
    }
}

impl BootMedia for BootImage {
    fn offset(&self) -> Word {
        self.offset
    }

    fn length(&self) -> Word {
        self.data.len() as Word
    }

    fn initial_ip(&self) -> Word {
        self.start
    }

    // Only indices strictly past `length` are rejected; the boot copy
    // iterates `0..length`, so `length` itself is never requested.
    fn load(&self, index: Word) -> Result<u8, OutOfMedia> {
        if index > self.length() {
            return Err(OutOfMedia {
                index,
                length: self.length(),
            });
        }

        Ok(self.data[index as usize])
    }
}
