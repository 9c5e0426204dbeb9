//! Unpadded base32 codec (RFC 4648).

use crate::error::{Error, Result};

/// RFC 4648 alphabet, `A-Z2-7`.
const ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Encode bytes as unpadded uppercase base32.
///
/// Each successive 5-bit group maps to one symbol; a final partial group
/// is shifted into the high bits of one last symbol. No `=` padding is
/// emitted.
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer = 0u32;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;

        while bits >= 5 {
            bits -= 5;
            out.push(ALPHABET[(buffer >> bits) as usize & 0x1f] as char);
        }
    }

    if bits > 0 {
        out.push(ALPHABET[(buffer << (5 - bits)) as usize & 0x1f] as char);
    }

    out
}

/// Decode unpadded base32, case-insensitively.
///
/// The 5-bit values are concatenated into a bitstream and re-sliced into
/// bytes; trailing bits that do not fill a whole byte are discarded.
///
/// # Errors
///
/// Returns [`Error::InvalidCharacter`] on any character outside the
/// RFC 4648 alphabet.
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer = 0u32;
    let mut bits = 0;

    for ch in text.chars() {
        let value = symbol_value(ch).ok_or(Error::InvalidCharacter(ch))?;
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
        }
    }

    Ok(out)
}

fn symbol_value(ch: char) -> Option<u8> {
    let upper = ch.to_ascii_uppercase();
    ALPHABET
        .iter()
        .position(|&symbol| symbol as char == upper)
        .map(|index| index as u8)
}
