use crate::col::FieldDescriptor;
use crate::constant::TypeCode;
use crate::error::{Error, Result};
use crate::protocol::primitive::*;
use crate::protocol::{lob, temporal};

/// Raw field payloads of one row. `None` is NULL.
///
/// Payloads are the value bytes without null or length indicators, except for
/// LOB fields which keep their descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<Option<Vec<u8>>>,
}

impl RawRow {
    pub fn new(fields: Vec<Option<Vec<u8>>>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<Option<&[u8]>> {
        self.fields.get(idx).map(Option::as_deref)
    }

    pub fn fields(&self) -> impl Iterator<Item = Option<&[u8]>> {
        self.fields.iter().map(Option::as_deref)
    }
}

impl From<Vec<Option<Vec<u8>>>> for RawRow {
    fn from(fields: Vec<Option<Vec<u8>>>) -> Self {
        Self::new(fields)
    }
}

/// Split `row_count` rows off a result-set row-data part
pub fn read_rows(fields: &[FieldDescriptor], mut data: &[u8], row_count: usize) -> Result<Vec<RawRow>> {
    let mut rows = Vec::with_capacity(row_count);
    for _ in 0..row_count {
        let mut row = Vec::with_capacity(fields.len());
        for field in fields {
            let (payload, rest) = read_field(field.type_code, data)?;
            row.push(payload.map(<[u8]>::to_vec));
            data = rest;
        }
        rows.push(RawRow::new(row));
    }
    if !data.is_empty() {
        tracing::warn!(trailing = data.len(), "row data has trailing bytes");
    }
    Ok(rows)
}

/// Read one field of row data, returning its payload (`None` for NULL) and the rest.
pub fn read_field(tc: TypeCode, data: &[u8]) -> Result<(Option<&[u8]>, &[u8])> {
    match tc {
        TypeCode::Tinyint => read_valid(data, 1),
        TypeCode::Smallint => read_valid(data, 2),
        TypeCode::Integer => read_valid(data, 4),
        TypeCode::Bigint | TypeCode::Fixed8 => read_valid(data, 8),
        TypeCode::Fixed12 => read_valid(data, 12),
        TypeCode::Fixed16 => read_valid(data, 16),

        TypeCode::Real => {
            let (bytes, rest) = read_bytes_fix(data, 4)?;
            let null = bytes.iter().all(|&b| b == 0xFF);
            Ok((if null { None } else { Some(bytes) }, rest))
        }
        TypeCode::Double => {
            let (bytes, rest) = read_bytes_fix(data, 8)?;
            let null = bytes.iter().all(|&b| b == 0xFF);
            Ok((if null { None } else { Some(bytes) }, rest))
        }
        TypeCode::Decimal | TypeCode::Smalldecimal => {
            let (bytes, rest) = read_bytes_fix(data, 16)?;
            let null = bytes[15] & 0x70 == 0x70;
            Ok((if null { None } else { Some(bytes) }, rest))
        }

        TypeCode::Boolean => {
            let (bytes, rest) = read_bytes_fix(data, 1)?;
            Ok((if bytes[0] == 1 { None } else { Some(bytes) }, rest))
        }

        TypeCode::Date
        | TypeCode::Time
        | TypeCode::Timestamp
        | TypeCode::Longdate
        | TypeCode::Seconddate
        | TypeCode::Daydate
        | TypeCode::Secondtime => {
            let size = temporal::payload_size(tc).ok_or(Error::UnknownTypeCode(tc as u8))?;
            let (bytes, rest) = read_bytes_fix(data, size)?;
            let null = temporal::is_null(tc, bytes)?;
            Ok((if null { None } else { Some(bytes) }, rest))
        }

        TypeCode::Char
        | TypeCode::Varchar
        | TypeCode::Nchar
        | TypeCode::Nvarchar
        | TypeCode::String
        | TypeCode::Nstring
        | TypeCode::Shorttext
        | TypeCode::Alphanum
        | TypeCode::Binary
        | TypeCode::Varbinary
        | TypeCode::Bstring => read_bytes_var(data),

        TypeCode::Clob
        | TypeCode::Nclob
        | TypeCode::Blob
        | TypeCode::Text
        | TypeCode::Bintext
        | TypeCode::Locator => match lob::field_size(data)? {
            Some(size) => {
                let (bytes, rest) = read_bytes_fix(data, size)?;
                Ok((Some(bytes), rest))
            }
            None => Ok((None, &data[lob::NULL_LOB_SIZE..])),
        },

        TypeCode::TableRef | TypeCode::TableRows => Err(Error::UnknownTypeCode(tc as u8)),
        tc => Err(Error::UnsupportedTypeCode(tc)),
    }
}

/// A leading valid byte (0 = NULL) followed by `size` bytes for non-NULL values
fn read_valid(data: &[u8], size: usize) -> Result<(Option<&[u8]>, &[u8])> {
    let (valid, rest) = read_u8(data)?;
    if valid == 0 {
        return Ok((None, rest));
    }
    let (bytes, rest) = read_bytes_fix(rest, size)?;
    Ok((Some(bytes), rest))
}
