//! Hex byte-string parsing for captures and the command line
//!
//! Accepts `"01 E9 00"`, `"01e900"`, `"01:E9:00"` and `"0x01,0xE9,0x00"`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("Odd number of hex digits ({0})")]
    OddLength(usize),
    #[error("Invalid hex byte {text:?} at byte {position}")]
    InvalidByte { position: usize, text: String },
}

pub fn parse_hex(text: &str) -> Result<Vec<u8>, HexError> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ','))
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }

    digits
        .as_bytes()
        .chunks(2)
        .enumerate()
        .map(|(position, pair)| {
            let pair = std::str::from_utf8(pair).unwrap_or("");
            u8::from_str_radix(pair, 16).map_err(|_| HexError::InvalidByte {
                position,
                text: pair.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators() {
        let expected = vec![0x01, 0xE9, 0x00];
        assert_eq!(parse_hex("01 E9 00").unwrap(), expected);
        assert_eq!(parse_hex("01e900").unwrap(), expected);
        assert_eq!(parse_hex("01:E9:00").unwrap(), expected);
        assert_eq!(parse_hex("0x01, 0xE9, 0x00").unwrap(), expected);
        assert_eq!(parse_hex("  ").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_odd_length() {
        assert_eq!(parse_hex("01 E"), Err(HexError::OddLength(3)));
    }

    #[test]
    fn test_invalid_digit() {
        assert_eq!(
            parse_hex("01 ZZ"),
            Err(HexError::InvalidByte {
                position: 1,
                text: "ZZ".to_string()
            })
        );
    }
}
