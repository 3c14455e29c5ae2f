use zerocopy::byteorder::little_endian::{I32 as I32LE, I64 as I64LE, U64 as U64LE};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::{LobOptions, TypeCode};
use crate::error::{Error, Result};

/// Size of a non-NULL LOB descriptor without its inline chunk
pub const LOB_DESCRIPTOR_SIZE: usize = 32;
pub const NULL_LOB_SIZE: usize = 2;

/// LOB descriptor of a result-set field
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct LobDescriptor {
    pub type_code: u8,
    pub options: u8,
    pub filler: [u8; 2],
    pub char_length: I64LE,
    pub byte_length: I64LE,
    pub locator: U64LE,
    pub chunk_length: I32LE,
}

impl LobDescriptor {
    pub fn options(&self) -> LobOptions {
        LobOptions::from_bits_truncate(self.options)
    }

    pub fn is_last_data(&self) -> bool {
        self.options().contains(LobOptions::LAST_DATA)
    }

    pub fn char_length(&self) -> u64 {
        self.char_length.get().max(0) as u64
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length.get().max(0) as u64
    }

    pub fn locator(&self) -> u64 {
        self.locator.get()
    }
}

/// Parse a non-NULL LOB field payload into its descriptor and inline chunk
pub fn parse_descriptor(payload: &[u8]) -> Result<(&LobDescriptor, &[u8])> {
    if payload.len() < LOB_DESCRIPTOR_SIZE {
        return Err(Error::UnexpectedEof);
    }
    let (header, rest) = payload.split_at(LOB_DESCRIPTOR_SIZE);
    let desc = LobDescriptor::ref_from_bytes(header).map_err(Error::from_debug)?;
    let chunk_length = usize::try_from(desc.chunk_length.get()).map_err(|_| Error::InvalidPacket)?;
    if rest.len() < chunk_length {
        return Err(Error::UnexpectedEof);
    }
    Ok((desc, &rest[..chunk_length]))
}

/// Number of bytes a LOB field occupies in row data, `None` for a NULL LOB.
///
/// A NULL LOB occupies [`NULL_LOB_SIZE`] bytes (type code and options).
pub fn field_size(data: &[u8]) -> Result<Option<usize>> {
    let [_, options, ..] = data else {
        return Err(Error::UnexpectedEof);
    };
    if LobOptions::from_bits_truncate(*options).contains(LobOptions::NULL_INDICATOR) {
        return Ok(None);
    }
    if data.len() < LOB_DESCRIPTOR_SIZE {
        return Err(Error::UnexpectedEof);
    }
    let desc = LobDescriptor::ref_from_bytes(&data[..LOB_DESCRIPTOR_SIZE]).map_err(Error::from_debug)?;
    let chunk_length = usize::try_from(desc.chunk_length.get()).map_err(|_| Error::InvalidPacket)?;
    Ok(Some(LOB_DESCRIPTOR_SIZE + chunk_length))
}

/// Build the row-data bytes of a non-NULL LOB field
pub fn encode_descriptor(
    type_code: TypeCode,
    locator: u64,
    char_length: u64,
    byte_length: u64,
    chunk: &[u8],
    is_last: bool,
) -> Result<Vec<u8>> {
    let mut options = LobOptions::DATA_INCLUDED;
    if is_last {
        options |= LobOptions::LAST_DATA;
    }
    let to_i64 = |v: u64| i64::try_from(v).map_err(|_| Error::BadUsageError(format!("LOB length {v} too large")));
    let desc = LobDescriptor {
        type_code: type_code as u8,
        options: options.bits(),
        filler: [0; 2],
        char_length: I64LE::new(to_i64(char_length)?),
        byte_length: I64LE::new(to_i64(byte_length)?),
        locator: U64LE::new(locator),
        chunk_length: I32LE::new(
            i32::try_from(chunk.len())
                .map_err(|_| Error::BadUsageError("LOB chunk too large".to_owned()))?,
        ),
    };
    let mut out = Vec::with_capacity(LOB_DESCRIPTOR_SIZE + chunk.len());
    out.extend_from_slice(desc.as_bytes());
    out.extend_from_slice(chunk);
    Ok(out)
}

/// Row-data bytes of a NULL LOB field
pub fn encode_null_descriptor(type_code: TypeCode) -> [u8; 2] {
    [type_code as u8, LobOptions::NULL_INDICATOR.bits()]
}
