use crate::col::FieldDescriptor;
use crate::constant::{NULL_TYPE_CODE_FLAG, TypeCode};
use crate::error::{Error, Result};
use crate::lob::Lob;
use crate::protocol::decimal::Decimal;
use crate::protocol::primitive::*;
use crate::protocol::{cesu8, temporal};
use crate::value::Value;

/// Alphanum flag byte: the value is numeric
pub const ALPHANUM_NUMERIC: u8 = 0x80;

/// Decode one field payload. `None` decodes to [`Value::Null`].
///
/// LOB values are returned unbound.
pub fn decode_field(desc: &FieldDescriptor, payload: Option<&[u8]>) -> Result<Value> {
    let Some(payload) = payload else {
        return Ok(Value::Null);
    };
    let tc = desc.type_code;
    let value = match tc {
        TypeCode::Tinyint => Value::Tinyint(read_u8(payload)?.0),
        TypeCode::Smallint => Value::Smallint(read_i16(payload)?.0),
        TypeCode::Integer => Value::Integer(read_i32(payload)?.0),
        TypeCode::Bigint => Value::Bigint(read_i64(payload)?.0),
        TypeCode::Real => Value::Real(f32::from_bits(read_i32(payload)?.0 as u32)),
        TypeCode::Double => Value::Double(f64::from_bits(read_u64(payload)?.0)),

        TypeCode::Decimal | TypeCode::Smalldecimal => {
            let bytes: &[u8; 16] = payload.try_into().map_err(|_| Error::InvalidPacket)?;
            Value::Decimal(Decimal::from_decimal128(bytes))
        }
        TypeCode::Fixed8 | TypeCode::Fixed12 | TypeCode::Fixed16 => {
            let scale = desc.declared_scale().unwrap_or(0) as i32;
            Value::Decimal(Decimal::from_fixed(payload, scale)?)
        }

        TypeCode::Nchar | TypeCode::Nvarchar | TypeCode::Nstring | TypeCode::Shorttext => {
            Value::String(cesu8::decode(payload)?)
        }
        // may hold bytes that are not text
        TypeCode::Char | TypeCode::Varchar | TypeCode::String => match cesu8::decode(payload) {
            Ok(text) => Value::String(text),
            Err(_) => Value::Bytes(payload.to_vec()),
        },
        TypeCode::Alphanum => Value::String(decode_alphanum(payload)?),

        TypeCode::Binary | TypeCode::Varbinary | TypeCode::Bstring => {
            Value::Bytes(payload.to_vec())
        }

        TypeCode::Boolean => match read_u8(payload)?.0 {
            0 => Value::Boolean(false),
            2 => Value::Boolean(true),
            _ => return Err(Error::InvalidPacket),
        },

        TypeCode::Date
        | TypeCode::Time
        | TypeCode::Timestamp
        | TypeCode::Longdate
        | TypeCode::Seconddate
        | TypeCode::Daydate
        | TypeCode::Secondtime => Value::Time(temporal::decode(tc, payload)?),

        TypeCode::Clob
        | TypeCode::Nclob
        | TypeCode::Blob
        | TypeCode::Text
        | TypeCode::Bintext
        | TypeCode::Locator => Value::Lob(Lob::from_payload(tc, payload)?),

        TypeCode::TableRef | TypeCode::TableRows => {
            return Err(Error::UnknownTypeCode(tc as u8));
        }
        tc => return Err(Error::UnsupportedTypeCode(tc)),
    };
    Ok(value)
}

/// Encode a parameter as `[type code][payload]`; NULL is the type code with its high bit set.
pub fn encode_param(desc: &FieldDescriptor, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    let tc = desc.type_code.encoding_alias();
    if value.is_null() {
        write_u8(out, tc as u8 | NULL_TYPE_CODE_FLAG);
        return Ok(());
    }
    let mismatch = || {
        Error::BadUsageError(format!(
            "Cannot encode {:?} as {}",
            value.canonical_type(),
            tc.type_name()
        ))
    };

    let mut payload = Vec::new();
    match tc {
        TypeCode::Tinyint => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            let v = u8::try_from(v).map_err(|_| out_of_range(v, tc))?;
            write_u8(&mut payload, v);
        }
        TypeCode::Smallint => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            let v = i16::try_from(v).map_err(|_| out_of_range(v, tc))?;
            write_i16(&mut payload, v);
        }
        TypeCode::Integer => {
            let v = value.as_i64().ok_or_else(mismatch)?;
            let v = i32::try_from(v).map_err(|_| out_of_range(v, tc))?;
            write_i32(&mut payload, v);
        }
        TypeCode::Bigint => write_i64(&mut payload, value.as_i64().ok_or_else(mismatch)?),

        TypeCode::Real => {
            let v = match *value {
                Value::Real(v) => v,
                Value::Double(v) => v as f32,
                _ => return Err(mismatch()),
            };
            payload.extend_from_slice(&v.to_le_bytes());
        }
        TypeCode::Double => {
            let v = match *value {
                Value::Real(v) => f64::from(v),
                Value::Double(v) => v,
                _ => value.as_i64().ok_or_else(mismatch)? as f64,
            };
            payload.extend_from_slice(&v.to_le_bytes());
        }

        TypeCode::Decimal
        | TypeCode::Smalldecimal
        | TypeCode::Fixed8
        | TypeCode::Fixed12
        | TypeCode::Fixed16 => {
            let v = match value {
                Value::Decimal(d) => *d,
                Value::String(s) => s.parse()?,
                v => Decimal::from(v.as_i64().ok_or_else(mismatch)?),
            };
            payload = v.encode_for(tc, desc.declared_scale())?;
        }

        TypeCode::Char
        | TypeCode::Varchar
        | TypeCode::Nchar
        | TypeCode::Nvarchar
        | TypeCode::String
        | TypeCode::Nstring
        | TypeCode::Shorttext
        | TypeCode::Alphanum => {
            let Value::String(s) = value else {
                return Err(mismatch());
            };
            write_bytes_var(&mut payload, &cesu8::encode_to_vec(s))?;
        }

        TypeCode::Binary | TypeCode::Varbinary | TypeCode::Bstring => {
            let bytes = match value {
                Value::Bytes(b) => b.as_slice(),
                Value::String(s) => s.as_bytes(),
                _ => return Err(mismatch()),
            };
            write_bytes_var(&mut payload, bytes)?;
        }

        TypeCode::Boolean => {
            let Value::Boolean(b) = *value else {
                return Err(mismatch());
            };
            write_u8(&mut payload, u8::from(b));
        }

        TypeCode::Date
        | TypeCode::Time
        | TypeCode::Timestamp
        | TypeCode::Longdate
        | TypeCode::Seconddate
        | TypeCode::Daydate
        | TypeCode::Secondtime => {
            let Value::Time(dt) = *value else {
                return Err(mismatch());
            };
            temporal::encode(tc, dt, &mut payload)?;
        }

        TypeCode::Clob | TypeCode::Nclob | TypeCode::Blob => {
            return Err(Error::BadUsageError(format!(
                "{} parameters are written through a LobWriter",
                tc.type_name()
            )));
        }

        tc => return Err(Error::UnsupportedTypeCode(tc)),
    }

    write_u8(out, tc as u8);
    out.extend_from_slice(&payload);
    Ok(())
}

/// Numeric alphanums are zero-padded to their precision
fn decode_alphanum(payload: &[u8]) -> Result<String> {
    let Some((&flag, text)) = payload.split_first() else {
        return Ok(String::new());
    };
    let text = cesu8::decode(text)?;
    if flag & ALPHANUM_NUMERIC == 0 {
        return Ok(text);
    }
    let precision = usize::from(flag & !ALPHANUM_NUMERIC);
    Ok(format!("{text:0>precision$}"))
}

fn out_of_range(v: i64, tc: TypeCode) -> Error {
    Error::BadUsageError(format!("{v} out of range for {}", tc.type_name()))
}

/// Encode a parameter row
pub fn encode_params(descs: &[FieldDescriptor], values: &[Value], out: &mut Vec<u8>) -> Result<()> {
    if descs.len() != values.len() {
        return Err(Error::BadUsageError(format!(
            "expected {} parameters, got {}",
            descs.len(),
            values.len()
        )));
    }
    for (desc, value) in descs.iter().zip(values) {
        encode_param(desc, value, out)?;
    }
    Ok(())
}
