// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fixed-capacity text fields packed into holding registers
//!
//! Each field spans [`TEXT_FIELD_WORDS`] words and stores two bytes per word,
//! the first byte in the low-order half. Unused bytes are zero. This is the
//! byte order of the packed little-endian memory image that clients already
//! decode, so it must not change.

use super::address_map::TEXT_FIELD_WORDS;
use super::RegisterError;

/// Words backing one text field.
pub type TextWords = [u16; TEXT_FIELD_WORDS];

/// Capacity of one text field in bytes.
pub const TEXT_CAPACITY: usize = TEXT_FIELD_WORDS * 2;

/// Pack `text` into a zero-padded word array.
///
/// Fails with [`RegisterError::TextTooLong`] when the UTF-8 encoding of
/// `text` exceeds [`TEXT_CAPACITY`] bytes. Nothing is truncated silently.
pub fn encode_text(text: &str) -> Result<TextWords, RegisterError> {
    let bytes = text.as_bytes();
    if bytes.len() > TEXT_CAPACITY {
        return Err(RegisterError::TextTooLong {
            len: bytes.len(),
            capacity: TEXT_CAPACITY,
        });
    }

    let mut words = [0u16; TEXT_FIELD_WORDS];
    for (i, chunk) in bytes.chunks(2).enumerate() {
        let low = chunk[0] as u16;
        let high = chunk.get(1).copied().unwrap_or(0) as u16;
        words[i] = (high << 8) | low;
    }
    Ok(words)
}

/// Unpack a text field, stopping at the first NUL byte.
///
/// Bytes that are not valid UTF-8 (a client may write anything) are
/// replaced rather than rejected.
pub fn decode_text(words: &TextWords) -> String {
    let bytes: Vec<u8> = words
        .iter()
        .flat_map(|w| [(w & 0x00FF) as u8, (w >> 8) as u8])
        .take_while(|b| *b != 0)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
