use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::constant::CanonicalType;
use crate::error::{Error, Result};
use crate::lob::Lob;
use crate::protocol::decimal::Decimal;
use crate::session::ResultSetId;

/// A decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Tinyint(u8),
    Smallint(i16),
    Integer(i32),
    Bigint(i64),
    Real(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Boolean(bool),
    /// All date/time types; time-only values are on 0001-01-01
    Time(NaiveDateTime),
    Lob(Lob),
    /// Reference to a table output of a procedure call
    Rows(ResultSetId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `None` for NULL
    pub fn canonical_type(&self) -> Option<CanonicalType> {
        let ct = match self {
            Self::Null => return None,
            Self::Tinyint(_) => CanonicalType::Tinyint,
            Self::Smallint(_) => CanonicalType::Smallint,
            Self::Integer(_) => CanonicalType::Integer,
            Self::Bigint(_) => CanonicalType::Bigint,
            Self::Real(_) => CanonicalType::Real,
            Self::Double(_) => CanonicalType::Double,
            Self::Decimal(_) => CanonicalType::Decimal,
            Self::String(_) => CanonicalType::String,
            Self::Bytes(_) => CanonicalType::Bytes,
            Self::Boolean(_) => CanonicalType::Boolean,
            Self::Time(_) => CanonicalType::Time,
            Self::Lob(_) => CanonicalType::Lob,
            Self::Rows(_) => CanonicalType::Rows,
        };
        Some(ct)
    }

    /// Integer value of the integer variants
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Tinyint(v) => Some(i64::from(v)),
            Self::Smallint(v) => Some(i64::from(v)),
            Self::Integer(v) => Some(i64::from(v)),
            Self::Bigint(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    u8 => Tinyint,
    i16 => Smallint,
    i32 => Integer,
    i64 => Bigint,
    f32 => Real,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    &str => String,
    Vec<u8> => Bytes,
    &[u8] => Bytes,
    bool => Boolean,
    NaiveDateTime => Time,
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Time(v.and_time(NaiveTime::MIN))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion from a decoded [`Value`] into a Rust type.
///
/// Each method corresponds to a canonical type. Implementations return `Err`
/// for unsupported conversions.
pub trait FromValue: Sized {
    fn from_null() -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert NULL to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_i64(_v: i64) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert an integer to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_f32(v: f32) -> Result<Self> {
        Self::from_f64(f64::from(v))
    }

    fn from_f64(_v: f64) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert a floating point value to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_decimal(_v: Decimal) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert DECIMAL to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_string(_v: String) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert a string to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_bytes(_v: Vec<u8>) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert binary data to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_bool(_v: bool) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert BOOLEAN to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_datetime(_v: NaiveDateTime) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert a date/time to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_lob(_v: Lob) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert a LOB to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_rows(_v: ResultSetId) -> Result<Self> {
        Err(Error::BadUsageError(format!(
            "Cannot convert a table reference to {}",
            std::any::type_name::<Self>()
        )))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Self::from_null(),
            Value::Tinyint(v) => Self::from_i64(i64::from(v)),
            Value::Smallint(v) => Self::from_i64(i64::from(v)),
            Value::Integer(v) => Self::from_i64(i64::from(v)),
            Value::Bigint(v) => Self::from_i64(v),
            Value::Real(v) => Self::from_f32(v),
            Value::Double(v) => Self::from_f64(v),
            Value::Decimal(v) => Self::from_decimal(v),
            Value::String(v) => Self::from_string(v),
            Value::Bytes(v) => Self::from_bytes(v),
            Value::Boolean(v) => Self::from_bool(v),
            Value::Time(v) => Self::from_datetime(v),
            Value::Lob(v) => Self::from_lob(v),
            Value::Rows(v) => Self::from_rows(v),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(v).map(Some),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_i64(v: i64) -> Result<Self> {
                    <$t>::try_from(v).map_err(|_| {
                        Error::BadUsageError(format!(
                            "integer {} out of range for {}",
                            v,
                            stringify!($t)
                        ))
                    })
                }

                fn from_decimal(v: Decimal) -> Result<Self> {
                    if v.scale() > 0 && v.rescale(0)?.rescale(v.scale())? != v {
                        return Err(Error::BadUsageError(format!(
                            "decimal {v} has a fractional part"
                        )));
                    }
                    let int = v.rescale(0)?.mantissa();
                    let int = i64::try_from(int).map_err(|_| {
                        Error::BadUsageError(format!("decimal {v} out of range"))
                    })?;
                    Self::from_i64(int)
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f64 {
    fn from_i64(v: i64) -> Result<Self> {
        Ok(v as f64)
    }

    fn from_f64(v: f64) -> Result<Self> {
        Ok(v)
    }

    fn from_decimal(v: Decimal) -> Result<Self> {
        Ok(v.to_f64())
    }
}

impl FromValue for f32 {
    fn from_f32(v: f32) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for bool {
    fn from_bool(v: bool) -> Result<Self> {
        Ok(v)
    }

    fn from_i64(v: i64) -> Result<Self> {
        Ok(v != 0)
    }
}

impl FromValue for Decimal {
    fn from_decimal(v: Decimal) -> Result<Self> {
        Ok(v)
    }

    fn from_i64(v: i64) -> Result<Self> {
        Ok(Decimal::from(v))
    }
}

#[cfg(feature = "with-rust-decimal")]
impl FromValue for rust_decimal::Decimal {
    fn from_decimal(v: Decimal) -> Result<Self> {
        rust_decimal::Decimal::try_from(v)
    }

    fn from_i64(v: i64) -> Result<Self> {
        Ok(rust_decimal::Decimal::from(v))
    }
}

impl FromValue for String {
    fn from_string(v: String) -> Result<Self> {
        Ok(v)
    }

    fn from_decimal(v: Decimal) -> Result<Self> {
        Ok(v.to_string())
    }

    /// Legacy table references
    fn from_rows(v: ResultSetId) -> Result<Self> {
        Ok(v.to_string())
    }
}

impl FromValue for Vec<u8> {
    fn from_bytes(v: Vec<u8>) -> Result<Self> {
        Ok(v)
    }

    fn from_string(v: String) -> Result<Self> {
        Ok(v.into_bytes())
    }
}

impl FromValue for NaiveDateTime {
    fn from_datetime(v: NaiveDateTime) -> Result<Self> {
        Ok(v)
    }
}

impl FromValue for NaiveDate {
    fn from_datetime(v: NaiveDateTime) -> Result<Self> {
        Ok(v.date())
    }
}

impl FromValue for NaiveTime {
    fn from_datetime(v: NaiveDateTime) -> Result<Self> {
        Ok(v.time())
    }
}

impl FromValue for Lob {
    fn from_lob(v: Lob) -> Result<Self> {
        Ok(v)
    }
}
