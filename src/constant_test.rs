use crate::constant::{CanonicalType, TypeCode, classify};
use crate::error::Error;

#[test]
fn classify_every_byte() {
    let unsupported = [
        TypeCode::NullL,
        TypeCode::Timetz,
        TypeCode::Timeltz,
        TypeCode::TimestampTz,
        TypeCode::TimestampLtz,
        TypeCode::IntervalYm,
        TypeCode::IntervalDs,
        TypeCode::Rowid,
        TypeCode::Urowid,
        TypeCode::Nlocator,
        TypeCode::DecimalDigitArray,
        TypeCode::Varchar2,
        TypeCode::Table,
        TypeCode::Abapstream,
        TypeCode::Abapstruct,
        TypeCode::Aarray,
        TypeCode::Clocator,
        TypeCode::BlobDiskReserved,
        TypeCode::ClobDiskReserved,
        TypeCode::NclobDiskReserved,
        TypeCode::StGeometry,
        TypeCode::StPoint,
        TypeCode::AbapItab,
        TypeCode::RecordRowStore,
        TypeCode::RecordColumnStore,
        TypeCode::Ciphertext,
    ];

    for code in 0..=u8::MAX {
        match TypeCode::from_u8(code) {
            Some(tc) if unsupported.contains(&tc) => {
                assert!(matches!(classify(code), Err(Error::UnsupportedTypeCode(t)) if t == tc));
                assert!(classify(code).unwrap_err().is_protocol_mismatch());
            }
            Some(tc) => {
                assert_eq!(tc as u8, code);
                assert!(classify(code).is_ok(), "{tc:?} must classify");
            }
            None => {
                assert!(matches!(classify(code), Err(Error::UnknownTypeCode(c)) if c == code));
            }
        }
    }
}

#[test]
fn classify_known_codes() {
    assert_eq!(classify(0x03).unwrap(), CanonicalType::Integer);
    assert_eq!(classify(0x0B).unwrap(), CanonicalType::String);
    assert_eq!(classify(0x05).unwrap(), CanonicalType::Decimal);
    assert_eq!(classify(0x51).unwrap(), CanonicalType::Decimal);
    assert_eq!(classify(0x3D).unwrap(), CanonicalType::Time);
    assert_eq!(classify(0x1B).unwrap(), CanonicalType::Lob);
    assert_eq!(classify(0x1C).unwrap(), CanonicalType::Boolean);
    assert_eq!(classify(0x21).unwrap(), CanonicalType::Bytes);
    assert_eq!(classify(0x7F).unwrap(), CanonicalType::Rows);
}

#[test]
fn classify_unknown_code() {
    let err = classify(0x99).unwrap_err();
    assert!(matches!(err, Error::UnknownTypeCode(0x99)));
    assert!(err.is_protocol_mismatch());
}

#[test]
fn internal_codes_rejected_from_wire() {
    assert!(matches!(
        TypeCode::from_wire(0x7E),
        Err(Error::UnknownTypeCode(0x7E))
    ));
    assert!(matches!(
        TypeCode::from_wire(0x7F),
        Err(Error::UnknownTypeCode(0x7F))
    ));
    assert_eq!(TypeCode::from_wire(0x0B).unwrap(), TypeCode::Nvarchar);
}

#[test]
fn predicates() {
    assert!(TypeCode::Blob.is_lob());
    assert!(TypeCode::Locator.is_lob());
    assert!(!TypeCode::Nvarchar.is_lob());

    assert!(TypeCode::Nclob.is_character_encoded());
    assert!(TypeCode::Bintext.is_character_encoded());
    assert!(!TypeCode::Clob.is_character_encoded());
    assert!(!TypeCode::Varchar.is_character_encoded());

    assert!(TypeCode::Alphanum.is_variable_length());
    assert!(!TypeCode::Nstring.is_variable_length());

    assert!(TypeCode::Bigint.is_integer_family());
    assert!(!TypeCode::Decimal.is_integer_family());

    assert!(TypeCode::Fixed12.is_decimal_family());
    assert!(TypeCode::Smalldecimal.is_decimal_family());
    assert!(!TypeCode::Double.is_decimal_family());
}

#[test]
fn encoding_alias_collapses_text_types() {
    assert_eq!(TypeCode::Text.encoding_alias(), TypeCode::Nclob);
    assert_eq!(TypeCode::Bintext.encoding_alias(), TypeCode::Nclob);
    assert_eq!(TypeCode::Locator.encoding_alias(), TypeCode::Nclob);
    assert_eq!(TypeCode::Blob.encoding_alias(), TypeCode::Blob);
}

#[test]
fn type_names() {
    assert_eq!(TypeCode::Nvarchar.type_name(), "NVARCHAR");
    assert_eq!(TypeCode::Seconddate.type_name(), "SECONDDATE");
    assert_eq!(TypeCode::Fixed16.type_name(), "FIXED16");
}
