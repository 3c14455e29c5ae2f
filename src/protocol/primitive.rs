use crate::error::{Error, Result};
use zerocopy::FromBytes;
use zerocopy::byteorder::little_endian::{I16 as I16LE, I32 as I32LE, I64 as I64LE, U64 as U64LE};

/// Length indicator: the value itself is the length
pub const LENGTH_INDICATOR_MAX_INLINE: u8 = 245;
/// Length indicator: a 2-byte length follows
pub const LENGTH_INDICATOR_2: u8 = 246;
/// Length indicator: a 4-byte length follows
pub const LENGTH_INDICATOR_4: u8 = 247;
/// Length indicator: the value is NULL
pub const LENGTH_INDICATOR_NULL: u8 = 255;

/// Read 1-byte integer
pub fn read_u8(data: &[u8]) -> Result<(u8, &[u8])> {
    match data.split_first() {
        Some((&b, rest)) => Ok((b, rest)),
        None => Err(Error::UnexpectedEof),
    }
}

/// Read 2-byte little-endian integer
pub fn read_i16(data: &[u8]) -> Result<(i16, &[u8])> {
    if data.len() < 2 {
        return Err(Error::UnexpectedEof);
    }
    let value = I16LE::ref_from_bytes(&data[..2])
        .map_err(|_| Error::InvalidPacket)?
        .get();
    Ok((value, &data[2..]))
}

/// Read 4-byte little-endian integer
pub fn read_i32(data: &[u8]) -> Result<(i32, &[u8])> {
    if data.len() < 4 {
        return Err(Error::UnexpectedEof);
    }
    let value = I32LE::ref_from_bytes(&data[..4])
        .map_err(|_| Error::InvalidPacket)?
        .get();
    Ok((value, &data[4..]))
}

/// Read 8-byte little-endian integer
pub fn read_i64(data: &[u8]) -> Result<(i64, &[u8])> {
    if data.len() < 8 {
        return Err(Error::UnexpectedEof);
    }
    let value = I64LE::ref_from_bytes(&data[..8])
        .map_err(|_| Error::InvalidPacket)?
        .get();
    Ok((value, &data[8..]))
}

/// Read 8-byte little-endian unsigned integer
pub fn read_u64(data: &[u8]) -> Result<(u64, &[u8])> {
    if data.len() < 8 {
        return Err(Error::UnexpectedEof);
    }
    let value = U64LE::ref_from_bytes(&data[..8])
        .map_err(|_| Error::InvalidPacket)?
        .get();
    Ok((value, &data[8..]))
}

/// Read fixed-length bytes
pub fn read_bytes_fix(data: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if data.len() < len {
        return Err(Error::UnexpectedEof);
    }
    Ok(data.split_at(len))
}

/// Read a length indicator. `None` means NULL.
pub fn read_length_indicator(data: &[u8]) -> Result<(Option<usize>, &[u8])> {
    let (ind, rest) = read_u8(data)?;
    match ind {
        0..=LENGTH_INDICATOR_MAX_INLINE => Ok((Some(ind as usize), rest)),
        LENGTH_INDICATOR_2 => {
            let (len, rest) = read_i16(rest)?;
            let len = usize::try_from(len).map_err(|_| Error::InvalidPacket)?;
            Ok((Some(len), rest))
        }
        LENGTH_INDICATOR_4 => {
            let (len, rest) = read_i32(rest)?;
            let len = usize::try_from(len).map_err(|_| Error::InvalidPacket)?;
            Ok((Some(len), rest))
        }
        LENGTH_INDICATOR_NULL => Ok((None, rest)),
        _ => Err(Error::InvalidPacket),
    }
}

/// Read a length-prefixed byte string. `None` means NULL.
pub fn read_bytes_var(data: &[u8]) -> Result<(Option<&[u8]>, &[u8])> {
    match read_length_indicator(data)? {
        (Some(len), rest) => {
            let (bytes, rest) = read_bytes_fix(rest, len)?;
            Ok((Some(bytes), rest))
        }
        (None, rest) => Ok((None, rest)),
    }
}

/// Write 1-byte integer
pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

/// Write 2-byte little-endian integer
pub fn write_i16(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 4-byte little-endian integer
pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write 8-byte little-endian integer
pub fn write_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Write a length indicator
pub fn write_length_indicator(out: &mut Vec<u8>, len: usize) -> Result<()> {
    if len <= LENGTH_INDICATOR_MAX_INLINE as usize {
        out.push(len as u8);
    } else if let Ok(len) = i16::try_from(len) {
        out.push(LENGTH_INDICATOR_2);
        write_i16(out, len);
    } else if let Ok(len) = i32::try_from(len) {
        out.push(LENGTH_INDICATOR_4);
        write_i32(out, len);
    } else {
        return Err(Error::BadUsageError(format!(
            "value of {len} bytes exceeds the maximum field length"
        )));
    }
    Ok(())
}

/// Write a length-prefixed byte string
pub fn write_bytes_var(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    write_length_indicator(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}
