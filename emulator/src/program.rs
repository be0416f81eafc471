use libemu16isa::Word;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("Invalid byte token {0:?} (expected two hex digits)")]
    InvalidToken(String),

    #[error("Not enough data to run a program")]
    NotEnoughData,
}

/// A parsed program image: where it loads, where it starts, and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    pub offset: Word,
    pub initial_ip: Word,
    pub data: Vec<u8>,
}

/// Parses the textual image format: hex byte pairs separated by newlines,
/// spaces or commas, with `#` comments running to end of line. The first
/// four bytes are the big-endian load offset and initial IP; the rest is
/// the payload.
pub fn parse(source: &str) -> Result<ProgramImage, ProgramError> {
    let mut data = Vec::new();

    for line in source.lines() {
        let line = line.split('#').next().unwrap_or("");

        for token in line.split([' ', ',']) {
            if token.is_empty() {
                continue;
            }

            data.push(parse_byte(token)?);
        }
    }

    if data.len() < 5 {
        return Err(ProgramError::NotEnoughData);
    }

    let offset = libemu16isa::bytes_to_word([data[0], data[1]]);
    let initial_ip = libemu16isa::bytes_to_word([data[2], data[3]]);
    let payload = data.split_off(4);

    Ok(ProgramImage {
        offset,
        initial_ip,
        data: payload,
    })
}

fn parse_byte(token: &str) -> Result<u8, ProgramError> {
    if token.len() != 2 {
        return Err(ProgramError::InvalidToken(token.to_string()));
    }

    u8::from_str_radix(token, 16).map_err(|_| ProgramError::InvalidToken(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse, ProgramError};

    #[test]
    fn parses_header_and_payload() {
        let image = parse("01 00 01 02\nde ad be ef\n").unwrap();

        assert_eq!(image.offset, 0x0100);
        assert_eq!(image.initial_ip, 0x0102);
        assert_eq!(image.data, [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn accepts_every_delimiter_and_case() {
        let image = parse("00 00,00 02\nDE,ad\nBe ef").unwrap();

        assert_eq!(image.data, [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn strips_comments_to_end_of_line() {
        let image = parse("# boot header\n00 00 00 02 # load low\nde ad # payload\nbe ef\n")
            .unwrap();

        assert_eq!(image.data, [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn rejects_short_images() {
        assert_eq!(parse("00 00 00 02"), Err(ProgramError::NotEnoughData));
        assert_eq!(parse("# nothing here\n"), Err(ProgramError::NotEnoughData));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert_eq!(
            parse("00 00 00 02 zz"),
            Err(ProgramError::InvalidToken("zz".to_string()))
        );

        // Runs of pairs must be split by a delimiter.
        assert_eq!(
            parse("00 00 00 02 dead"),
            Err(ProgramError::InvalidToken("dead".to_string()))
        );
    }

    #[test]
    fn parses_the_multiply_demo() {
        let image = parse(include_str!("../../demos/multiply.e16")).unwrap();

        assert_eq!(image.offset, 0);
        assert_eq!(image.initial_ip, 2);
        assert_eq!(image.data.len(), 32);
        assert_eq!(&image.data[..4], [0x0A, 0x0F, 0x2B, 0x00]);
        assert_eq!(image.data[31], 0x45);
    }
}
