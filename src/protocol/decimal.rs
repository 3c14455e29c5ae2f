use std::fmt;
use std::str::FromStr;

use crate::constant::TypeCode;
use crate::error::{Error, Result};

/// Maximum number of significant digits of a decimal128 mantissa
pub const DECIMAL128_MAX_DIGITS: u32 = 34;

const DECIMAL128_EXPONENT_BIAS: i32 = 6176;
const DECIMAL128_MAX_BIASED_EXPONENT: i32 = 12287;
const DECIMAL128_MANTISSA_MASK: u128 = (1 << 113) - 1;

/// Exact decimal number `mantissa * 10^-scale`
///
/// Values are not normalized: `1.50` (mantissa 150, scale 2) and `1.5` compare unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    mantissa: i128,
    scale: i32,
}

fn pow10(exp: u32) -> Result<i128> {
    10i128
        .checked_pow(exp)
        .ok_or_else(|| Error::BadUsageError(format!("decimal scale 10^{exp} overflows")))
}

fn digit_count(mut v: u128) -> u32 {
    let mut n = 1;
    while v >= 10 {
        v /= 10;
        n += 1;
    }
    n
}

impl Decimal {
    pub const ZERO: Self = Self {
        mantissa: 0,
        scale: 0,
    };

    pub const fn new(mantissa: i128, scale: i32) -> Self {
        Self { mantissa, scale }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    /// The same value with `scale` fractional digits.
    ///
    /// Reducing the scale rounds half away from zero.
    pub fn rescale(&self, scale: i32) -> Result<Self> {
        if scale == self.scale {
            return Ok(*self);
        }
        if scale > self.scale {
            let factor = pow10(scale.abs_diff(self.scale))?;
            let mantissa = self.mantissa.checked_mul(factor).ok_or_else(|| {
                Error::BadUsageError(format!("decimal {self} does not fit scale {scale}"))
            })?;
            return Ok(Self { mantissa, scale });
        }

        let drop = self.scale.abs_diff(scale);
        let mantissa = match 10i128.checked_pow(drop) {
            Some(divisor) => {
                let quotient = self.mantissa / divisor;
                let remainder = (self.mantissa % divisor).unsigned_abs();
                if remainder * 2 >= divisor.unsigned_abs() {
                    quotient + self.mantissa.signum()
                } else {
                    quotient
                }
            }
            // every digit is dropped and the value is below half a unit
            None => 0,
        };
        Ok(Self { mantissa, scale })
    }

    /// Number of significant digits of the mantissa
    pub fn precision(&self) -> u32 {
        digit_count(self.mantissa.unsigned_abs())
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Decode a decimal128 field (DECIMAL, SMALLDECIMAL)
    pub fn from_decimal128(bytes: &[u8; 16]) -> Self {
        let raw = u128::from_le_bytes(*bytes);
        let negative = bytes[15] & 0x80 != 0;
        let word = (u16::from(bytes[15]) << 8) | u16::from(bytes[14]);
        let exponent = i32::from((word << 1) >> 2) - DECIMAL128_EXPONENT_BIAS;
        // 113 bits always fit
        let magnitude = (raw & DECIMAL128_MANTISSA_MASK) as i128;
        Self {
            mantissa: if negative { -magnitude } else { magnitude },
            scale: -exponent,
        }
    }

    /// Encode as decimal128 without changing the scale
    pub fn to_decimal128(&self) -> Result<[u8; 16]> {
        let magnitude = self.mantissa.unsigned_abs();
        if digit_count(magnitude) > DECIMAL128_MAX_DIGITS {
            return Err(Error::BadUsageError(format!(
                "decimal {self} exceeds {DECIMAL128_MAX_DIGITS} digits"
            )));
        }
        let biased = DECIMAL128_EXPONENT_BIAS - self.scale;
        if !(0..=DECIMAL128_MAX_BIASED_EXPONENT).contains(&biased) {
            return Err(Error::BadUsageError(format!(
                "decimal {self} exponent out of range"
            )));
        }
        let mut raw = magnitude | ((biased as u128) << 113);
        if self.mantissa < 0 {
            raw |= 1 << 127;
        }
        Ok(raw.to_le_bytes())
    }

    /// Decode a FIXED8/12/16 field; `bytes` is the little-endian two's complement integer.
    pub fn from_fixed(bytes: &[u8], scale: i32) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > 16 {
            return Err(Error::InvalidPacket);
        }
        let fill = if bytes[bytes.len() - 1] & 0x80 != 0 {
            0xFF
        } else {
            0x00
        };
        let mut buf = [fill; 16];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            mantissa: i128::from_le_bytes(buf),
            scale,
        })
    }

    /// Encode as a `width`-byte two's complement integer, rounded to `scale`
    pub fn to_fixed(&self, width: usize, scale: i32) -> Result<Vec<u8>> {
        let rescaled = self.rescale(scale)?;
        let bits = width * 8;
        let fits = bits >= 128 || {
            let bound = 1i128 << (bits - 1);
            (-bound..bound).contains(&rescaled.mantissa)
        };
        if !fits {
            return Err(Error::BadUsageError(format!(
                "decimal {self} does not fit FIXED{width}"
            )));
        }
        Ok(rescaled.mantissa.to_le_bytes()[..width].to_vec())
    }

    /// Encode for a decimal-family column.
    ///
    /// The value is first rounded to `declared_scale` if it is finer.
    pub fn encode_for(&self, type_code: TypeCode, declared_scale: Option<u32>) -> Result<Vec<u8>> {
        let scale = declared_scale.and_then(|s| i32::try_from(s).ok());
        match type_code {
            TypeCode::Decimal | TypeCode::Smalldecimal => {
                let value = match scale {
                    Some(scale) if self.scale > scale => self.rescale(scale)?,
                    _ => *self,
                };
                Ok(value.to_decimal128()?.to_vec())
            }
            TypeCode::Fixed8 => self.to_fixed(8, scale.unwrap_or(0)),
            TypeCode::Fixed12 => self.to_fixed(12, scale.unwrap_or(0)),
            TypeCode::Fixed16 => self.to_fixed(16, scale.unwrap_or(0)),
            tc => Err(Error::BadUsageError(format!(
                "Cannot encode decimal as {}",
                tc.type_name()
            ))),
        }
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(i128::from(value), 0)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let digits = self.mantissa.unsigned_abs().to_string();
        if self.scale <= 0 {
            let zeros = if self.mantissa == 0 {
                0
            } else {
                self.scale.unsigned_abs() as usize
            };
            return write!(f, "{sign}{digits}{}", "0".repeat(zeros));
        }
        let scale = self.scale.unsigned_abs() as usize;
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{int}.{frac}")
        } else {
            write!(f, "{sign}0.{}{digits}", "0".repeat(scale - digits.len()))
        }
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::BadUsageError(format!("invalid decimal literal {s:?}"));

        let (body, exponent) = match s.find(['e', 'E']) {
            Some(i) => {
                let exp: i32 = s.get(i + 1..).ok_or_else(bad)?.parse().map_err(|_| bad())?;
                (s.get(..i).ok_or_else(bad)?, exp)
            }
            None => (s, 0),
        };
        let (negative, body) = match body.as_bytes().first() {
            Some(b'-') => (true, body.get(1..).ok_or_else(bad)?),
            Some(b'+') => (false, body.get(1..).ok_or_else(bad)?),
            _ => (false, body),
        };
        let (int, frac) = body.split_once('.').unwrap_or((body, ""));
        if int.is_empty() && frac.is_empty() {
            return Err(bad());
        }

        let mut mantissa: i128 = 0;
        for c in int.bytes().chain(frac.bytes()) {
            if !c.is_ascii_digit() {
                return Err(bad());
            }
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(i128::from(c - b'0')))
                .ok_or_else(bad)?;
        }
        let frac_len = i32::try_from(frac.len()).map_err(|_| bad())?;
        let scale = frac_len.checked_sub(exponent).ok_or_else(bad)?;
        Ok(Self {
            mantissa: if negative { -mantissa } else { mantissa },
            scale,
        })
    }
}

#[cfg(feature = "with-rust-decimal")]
impl TryFrom<Decimal> for rust_decimal::Decimal {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        let value = if value.scale < 0 {
            value.rescale(0)?
        } else {
            value
        };
        let scale = value.scale.unsigned_abs();
        rust_decimal::Decimal::try_from_i128_with_scale(value.mantissa, scale)
            .map_err(|e| Error::BadUsageError(format!("decimal {value} out of range: {e}")))
    }
}

#[cfg(feature = "with-rust-decimal")]
impl From<rust_decimal::Decimal> for Decimal {
    fn from(value: rust_decimal::Decimal) -> Self {
        Self::new(value.mantissa(), value.scale() as i32)
    }
}
