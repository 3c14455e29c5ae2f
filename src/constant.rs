use crate::error::{Error, Result};

/// HANA type codes
///
/// The NULL variant of a value is signalled on the wire by setting the high bit
/// of the type code (see [`NULL_TYPE_CODE_FLAG`]).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    NullL = 0x00,
    Tinyint = 0x01,
    Smallint = 0x02,
    Integer = 0x03,
    Bigint = 0x04,
    Decimal = 0x05,
    Real = 0x06,
    Double = 0x07,
    Char = 0x08,
    Varchar = 0x09,
    Nchar = 0x0A,
    Nvarchar = 0x0B,
    Binary = 0x0C,
    Varbinary = 0x0D,
    Date = 0x0E,
    Time = 0x0F,
    Timestamp = 0x10,
    Timetz = 0x11,
    Timeltz = 0x12,
    TimestampTz = 0x13,
    TimestampLtz = 0x14,
    IntervalYm = 0x15,
    IntervalDs = 0x16,
    Rowid = 0x17,
    Urowid = 0x18,
    Clob = 0x19,
    Nclob = 0x1A,
    Blob = 0x1B,
    Boolean = 0x1C,
    String = 0x1D,
    Nstring = 0x1E,
    Locator = 0x1F,
    Nlocator = 0x20,
    Bstring = 0x21,
    DecimalDigitArray = 0x22,
    Varchar2 = 0x23,
    Table = 0x2D,
    Smalldecimal = 0x2F,
    Abapstream = 0x30,
    Abapstruct = 0x31,
    Aarray = 0x32,
    Text = 0x33,
    Shorttext = 0x34,
    Bintext = 0x35,
    Alphanum = 0x37,
    Longdate = 0x3D,
    Seconddate = 0x3E,
    Daydate = 0x3F,
    Secondtime = 0x40,
    Clocator = 0x46,
    BlobDiskReserved = 0x47,
    ClobDiskReserved = 0x48,
    NclobDiskReserved = 0x49,
    StGeometry = 0x4A,
    StPoint = 0x4B,
    Fixed16 = 0x4C,
    AbapItab = 0x4D,
    RecordRowStore = 0x4E,
    RecordColumnStore = 0x4F,
    Fixed8 = 0x51,
    Fixed12 = 0x52,
    Ciphertext = 0x5A,

    // client-internal, never sent by the server
    TableRef = 0x7E,
    TableRows = 0x7F,
}

/// High bit of a parameter type code marks a NULL value
pub const NULL_TYPE_CODE_FLAG: u8 = 0x80;

impl TypeCode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::NullL),
            0x01 => Some(Self::Tinyint),
            0x02 => Some(Self::Smallint),
            0x03 => Some(Self::Integer),
            0x04 => Some(Self::Bigint),
            0x05 => Some(Self::Decimal),
            0x06 => Some(Self::Real),
            0x07 => Some(Self::Double),
            0x08 => Some(Self::Char),
            0x09 => Some(Self::Varchar),
            0x0A => Some(Self::Nchar),
            0x0B => Some(Self::Nvarchar),
            0x0C => Some(Self::Binary),
            0x0D => Some(Self::Varbinary),
            0x0E => Some(Self::Date),
            0x0F => Some(Self::Time),
            0x10 => Some(Self::Timestamp),
            0x11 => Some(Self::Timetz),
            0x12 => Some(Self::Timeltz),
            0x13 => Some(Self::TimestampTz),
            0x14 => Some(Self::TimestampLtz),
            0x15 => Some(Self::IntervalYm),
            0x16 => Some(Self::IntervalDs),
            0x17 => Some(Self::Rowid),
            0x18 => Some(Self::Urowid),
            0x19 => Some(Self::Clob),
            0x1A => Some(Self::Nclob),
            0x1B => Some(Self::Blob),
            0x1C => Some(Self::Boolean),
            0x1D => Some(Self::String),
            0x1E => Some(Self::Nstring),
            0x1F => Some(Self::Locator),
            0x20 => Some(Self::Nlocator),
            0x21 => Some(Self::Bstring),
            0x22 => Some(Self::DecimalDigitArray),
            0x23 => Some(Self::Varchar2),
            0x2D => Some(Self::Table),
            0x2F => Some(Self::Smalldecimal),
            0x30 => Some(Self::Abapstream),
            0x31 => Some(Self::Abapstruct),
            0x32 => Some(Self::Aarray),
            0x33 => Some(Self::Text),
            0x34 => Some(Self::Shorttext),
            0x35 => Some(Self::Bintext),
            0x37 => Some(Self::Alphanum),
            0x3D => Some(Self::Longdate),
            0x3E => Some(Self::Seconddate),
            0x3F => Some(Self::Daydate),
            0x40 => Some(Self::Secondtime),
            0x46 => Some(Self::Clocator),
            0x47 => Some(Self::BlobDiskReserved),
            0x48 => Some(Self::ClobDiskReserved),
            0x49 => Some(Self::NclobDiskReserved),
            0x4A => Some(Self::StGeometry),
            0x4B => Some(Self::StPoint),
            0x4C => Some(Self::Fixed16),
            0x4D => Some(Self::AbapItab),
            0x4E => Some(Self::RecordRowStore),
            0x4F => Some(Self::RecordColumnStore),
            0x51 => Some(Self::Fixed8),
            0x52 => Some(Self::Fixed12),
            0x5A => Some(Self::Ciphertext),
            0x7E => Some(Self::TableRef),
            0x7F => Some(Self::TableRows),
            _ => None,
        }
    }

    /// Parse a type code received from the server.
    ///
    /// The internal table codes and codes outside the known set are rejected.
    pub fn from_wire(value: u8) -> Result<Self> {
        match Self::from_u8(value) {
            Some(Self::TableRef | Self::TableRows) | None => Err(Error::UnknownTypeCode(value)),
            Some(tc) => Ok(tc),
        }
    }

    /// The canonical type values of this type code decode into.
    ///
    /// Fails with [`Error::UnsupportedTypeCode`] for registered codes that have no
    /// value representation (interval, spatial, ABAP and similar types).
    pub fn canonical_type(self) -> Result<CanonicalType> {
        use CanonicalType as C;
        let canonical = match self {
            Self::Tinyint => C::Tinyint,
            Self::Smallint => C::Smallint,
            Self::Integer => C::Integer,
            Self::Bigint => C::Bigint,
            Self::Real => C::Real,
            Self::Double => C::Double,
            Self::Date
            | Self::Time
            | Self::Timestamp
            | Self::Longdate
            | Self::Seconddate
            | Self::Daydate
            | Self::Secondtime => C::Time,
            Self::Decimal | Self::Smalldecimal | Self::Fixed8 | Self::Fixed12 | Self::Fixed16 => {
                C::Decimal
            }
            Self::Char
            | Self::Varchar
            | Self::String
            | Self::Alphanum
            | Self::Nchar
            | Self::Nvarchar
            | Self::Nstring
            | Self::Shorttext => C::String,
            Self::Binary | Self::Varbinary | Self::Bstring => C::Bytes,
            Self::Boolean => C::Boolean,
            // the server reports Bintext columns as Locator
            Self::Blob | Self::Clob | Self::Nclob | Self::Text | Self::Bintext | Self::Locator => {
                C::Lob
            }
            Self::TableRef => C::String,
            Self::TableRows => C::Rows,
            tc => return Err(Error::UnsupportedTypeCode(tc)),
        };
        Ok(canonical)
    }

    pub fn is_lob(self) -> bool {
        matches!(
            self,
            Self::Clob | Self::Nclob | Self::Blob | Self::Text | Self::Bintext | Self::Locator
        )
    }

    /// Columns whose values (and LOB offsets) are counted in CESU-8 characters
    pub fn is_character_encoded(self) -> bool {
        matches!(
            self,
            Self::Nvarchar | Self::Nstring | Self::Nclob | Self::Text | Self::Bintext
        )
    }

    /// Columns with a declared maximum length
    pub fn is_variable_length(self) -> bool {
        matches!(
            self,
            Self::Char
                | Self::Nchar
                | Self::Varchar
                | Self::Nvarchar
                | Self::Binary
                | Self::Varbinary
                | Self::Shorttext
                | Self::Alphanum
        )
    }

    pub fn is_integer_family(self) -> bool {
        matches!(
            self,
            Self::Tinyint | Self::Smallint | Self::Integer | Self::Bigint
        )
    }

    pub fn is_decimal_family(self) -> bool {
        matches!(
            self,
            Self::Smalldecimal | Self::Decimal | Self::Fixed8 | Self::Fixed12 | Self::Fixed16
        )
    }

    /// The type code to use when sending values of this type.
    ///
    /// Text, Bintext and Locator columns are all written as NCLOB.
    pub fn encoding_alias(self) -> Self {
        match self {
            Self::Text | Self::Bintext | Self::Locator => Self::Nclob,
            tc => tc,
        }
    }

    /// Database type name, e.g. `NVARCHAR` or `SECONDDATE`.
    ///
    /// For reporting only; decoding never looks at it.
    pub fn type_name(self) -> String {
        format!("{self:?}").to_uppercase()
    }
}

impl TryFrom<u8> for TypeCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_u8(value).ok_or(Error::UnknownTypeCode(value))
    }
}

/// Classify a raw type code byte.
///
/// Codes outside the registry fail with [`Error::UnknownTypeCode`], registered
/// codes without a value representation with [`Error::UnsupportedTypeCode`].
pub fn classify(code: u8) -> Result<CanonicalType> {
    TypeCode::try_from(code)?.canonical_type()
}

/// The value kinds all type codes collapse into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalType {
    Tinyint,
    Smallint,
    Integer,
    Bigint,
    Real,
    Double,
    Decimal,
    String,
    Bytes,
    Boolean,
    Time,
    Lob,
    Rows,
}

bitflags::bitflags! {
    /// Parameter/column mode byte of a field descriptor
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ColumnOptions: u8 {
        const MANDATORY = 0x01;
        const OPTIONAL = 0x02;
        const DEFAULT = 0x04;
        const ESCAPE_CHAR = 0x08;
        const READ_ONLY = 0x10;
        const AUTO_INCREMENT = 0x20;
        const ARRAY_TYPE = 0x40;
    }
}

bitflags::bitflags! {
    /// Option byte of a LOB descriptor or LOB chunk reply
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LobOptions: u8 {
        const NULL_INDICATOR = 0x01;
        const DATA_INCLUDED = 0x02;
        const LAST_DATA = 0x04;
    }
}

/// `fraction` reported for DECIMAL columns without a declared scale
pub const FLOATING_DECIMAL_FRACTION: i16 = 32767;
