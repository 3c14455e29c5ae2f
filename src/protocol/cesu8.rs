//! CESU-8, the encoding of N-types and character LOBs.
//!
//! Identical to UTF-8 except that characters outside the BMP are written as a
//! UTF-16 surrogate pair, each half encoded as a 3-byte sequence.

use simdutf8::basic::from_utf8;

use crate::error::{Error, Result};

/// Decode CESU-8 into a `String`.
///
/// 4-byte UTF-8 sequences are accepted as well.
pub fn decode(bytes: &[u8]) -> Result<String> {
    // surrogate halves are invalid UTF-8, so valid UTF-8 needs no conversion
    if let Ok(s) = from_utf8(bytes) {
        return Ok(s.to_owned());
    }

    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        let (c, len) = decode_char(rest)?;
        out.push(c);
        rest = &rest[len..];
    }
    Ok(out)
}

fn decode_char(b: &[u8]) -> Result<(char, usize)> {
    let lead = b[0];
    let (cp, len) = match lead {
        0x00..=0x7F => (u32::from(lead), 1),
        0xC0..=0xDF => (
            (u32::from(lead & 0x1F) << 6) | u32::from(continuation(b, 1)?),
            2,
        ),
        0xE0..=0xEF => (
            (u32::from(lead & 0x0F) << 12)
                | (u32::from(continuation(b, 1)?) << 6)
                | u32::from(continuation(b, 2)?),
            3,
        ),
        0xF0..=0xF7 => (
            (u32::from(lead & 0x07) << 18)
                | (u32::from(continuation(b, 1)?) << 12)
                | (u32::from(continuation(b, 2)?) << 6)
                | u32::from(continuation(b, 3)?),
            4,
        ),
        _ => return Err(Error::InvalidPacket),
    };

    match cp {
        0xD800..=0xDBFF => {
            let (low, _) = decode_surrogate(&b[3..])?;
            let cp = 0x10000 + ((cp - 0xD800) << 10) + (low - 0xDC00);
            let c = char::from_u32(cp).ok_or(Error::InvalidPacket)?;
            Ok((c, 6))
        }
        0xDC00..=0xDFFF => Err(Error::InvalidPacket),
        _ => {
            let c = char::from_u32(cp).ok_or(Error::InvalidPacket)?;
            Ok((c, len))
        }
    }
}

fn decode_surrogate(b: &[u8]) -> Result<(u32, usize)> {
    if b.first().is_none_or(|&lead| lead & 0xF0 != 0xE0) {
        return Err(Error::InvalidPacket);
    }
    let cp = (u32::from(b[0] & 0x0F) << 12)
        | (u32::from(continuation(b, 1)?) << 6)
        | u32::from(continuation(b, 2)?);
    if !(0xDC00..=0xDFFF).contains(&cp) {
        return Err(Error::InvalidPacket);
    }
    Ok((cp, 3))
}

fn continuation(b: &[u8], i: usize) -> Result<u8> {
    match b.get(i) {
        Some(&c) if c & 0xC0 == 0x80 => Ok(c & 0x3F),
        Some(_) | None => Err(Error::InvalidPacket),
    }
}

/// Encode a string as CESU-8.
pub fn encode(s: &str, out: &mut Vec<u8>) {
    out.reserve(encoded_len(s));
    for c in s.chars() {
        if (c as u32) < 0x10000 {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let unit = *unit;
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
}

pub fn encode_to_vec(s: &str) -> Vec<u8> {
    let mut out = Vec::new();
    encode(s, &mut out);
    out
}

/// Number of bytes `s` occupies in CESU-8
pub fn encoded_len(s: &str) -> usize {
    s.chars()
        .map(|c| if (c as u32) < 0x10000 { c.len_utf8() } else { 6 })
        .sum()
}

/// Number of characters (UTF-16 code units) in CESU-8 bytes
pub fn char_count(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b & 0xC0 != 0x80).count()
}

/// Length of the longest prefix of `bytes` that does not split a character.
pub fn char_boundary(bytes: &[u8]) -> usize {
    let mut end = bytes.len();
    while end > 0 && bytes[end - 1] & 0xC0 == 0x80 {
        end -= 1;
    }
    if end == 0 {
        return 0;
    }
    let lead = bytes[end - 1];
    let width = match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    };
    let boundary = if bytes.len() - (end - 1) >= width {
        bytes.len()
    } else {
        end - 1
    };
    // keep surrogate pairs together
    match bytes[..boundary] {
        [.., 0xED, 0xA0..=0xAF, _] => boundary - 3,
        _ => boundary,
    }
}
