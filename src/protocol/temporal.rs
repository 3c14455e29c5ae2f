//! Date/time wire formats.
//!
//! Every temporal column decodes to a [`NaiveDateTime`]. Time-only columns use
//! the date 0001-01-01.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use zerocopy::byteorder::little_endian::{I32 as I32LE, I64 as I64LE, U16 as U16LE};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::constant::TypeCode;
use crate::error::{Error, Result};

pub const LONGDATE_NULL: i64 = 3_155_380_704_000_000_001;
pub const SECONDDATE_NULL: i64 = 315_538_070_401;
pub const DAYDATE_NULL: i32 = 3_652_062;
pub const SECONDTIME_NULL: i32 = 86_402;

const DATE_NOT_NULL: u16 = 0x8000;
const TIME_NOT_NULL: u8 = 0x80;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// DATE - 4 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct WireDate {
    /// High bit set for non-NULL values
    pub year: U16LE,
    /// 0-based
    pub month: u8,
    pub day: u8,
}

impl WireDate {
    pub fn is_null(&self) -> bool {
        self.year.get() & DATE_NOT_NULL == 0
    }

    pub fn to_date(&self) -> Result<NaiveDate> {
        let year = i32::from(self.year.get() & 0x3FFF);
        NaiveDate::from_ymd_opt(year, u32::from(self.month) + 1, u32::from(self.day))
            .ok_or(Error::InvalidPacket)
    }

    fn from_date(date: NaiveDate) -> Result<Self> {
        let year = u16::try_from(date.year())
            .ok()
            .filter(|y| *y <= 0x3FFF)
            .ok_or_else(|| Error::BadUsageError(format!("date {date} out of range")))?;
        Ok(Self {
            year: U16LE::new(year | DATE_NOT_NULL),
            month: date.month0() as u8,
            day: date.day() as u8,
        })
    }
}

/// TIME - 4 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct WireTime {
    /// High bit set for non-NULL values
    pub hour: u8,
    pub minute: u8,
    /// seconds * 1000 + milliseconds
    pub millis: U16LE,
}

impl WireTime {
    pub fn is_null(&self) -> bool {
        self.hour & TIME_NOT_NULL == 0
    }

    pub fn to_time(&self) -> Result<NaiveTime> {
        let millis = u32::from(self.millis.get());
        NaiveTime::from_hms_milli_opt(
            u32::from(self.hour & !TIME_NOT_NULL),
            u32::from(self.minute),
            millis / 1000,
            millis % 1000,
        )
        .ok_or(Error::InvalidPacket)
    }

    fn from_time(time: NaiveTime) -> Self {
        let millis = time.second() * 1000 + time.nanosecond() / 1_000_000;
        Self {
            hour: time.hour() as u8 | TIME_NOT_NULL,
            minute: time.minute() as u8,
            millis: U16LE::new(millis as u16),
        }
    }
}

/// TIMESTAMP - 8 bytes
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct WireTimestamp {
    pub date: WireDate,
    pub time: WireTime,
}

/// 0001-01-01 00:00:00
fn epoch() -> NaiveDateTime {
    NaiveDate::from_num_days_from_ce_opt(1)
        .unwrap_or_default()
        .and_time(NaiveTime::MIN)
}

/// The date time-only columns are reported on
pub fn time_only(time: NaiveTime) -> NaiveDateTime {
    epoch().date().and_time(time)
}

/// Fixed payload size of a temporal type code
pub fn payload_size(tc: TypeCode) -> Option<usize> {
    match tc {
        TypeCode::Date | TypeCode::Time | TypeCode::Daydate | TypeCode::Secondtime => Some(4),
        TypeCode::Timestamp | TypeCode::Longdate | TypeCode::Seconddate => Some(8),
        _ => None,
    }
}

/// Whether a row-data payload holds the NULL value of its type
pub fn is_null(tc: TypeCode, payload: &[u8]) -> Result<bool> {
    let null = match tc {
        TypeCode::Date => WireDate::ref_from_bytes(payload)
            .map_err(Error::from_debug)?
            .is_null(),
        TypeCode::Time => WireTime::ref_from_bytes(payload)
            .map_err(Error::from_debug)?
            .is_null(),
        TypeCode::Timestamp => WireTimestamp::ref_from_bytes(payload)
            .map_err(Error::from_debug)?
            .date
            .is_null(),
        TypeCode::Longdate => read_i64(payload)? == LONGDATE_NULL,
        TypeCode::Seconddate => read_i64(payload)? == SECONDDATE_NULL,
        TypeCode::Daydate => read_i32(payload)? == DAYDATE_NULL,
        TypeCode::Secondtime => read_i32(payload)? == SECONDTIME_NULL,
        _ => return Err(Error::LibraryBug(crate::error::eyre!("{tc:?} is not temporal"))),
    };
    Ok(null)
}

fn read_i64(payload: &[u8]) -> Result<i64> {
    Ok(I64LE::ref_from_bytes(payload)
        .map_err(Error::from_debug)?
        .get())
}

fn read_i32(payload: &[u8]) -> Result<i32> {
    Ok(I32LE::ref_from_bytes(payload)
        .map_err(Error::from_debug)?
        .get())
}

fn add(base: NaiveDateTime, delta: Option<TimeDelta>) -> Result<NaiveDateTime> {
    delta
        .and_then(|d| base.checked_add_signed(d))
        .ok_or(Error::InvalidPacket)
}

/// Decode a non-NULL temporal payload
pub fn decode(tc: TypeCode, payload: &[u8]) -> Result<NaiveDateTime> {
    match tc {
        TypeCode::Date => {
            let date = WireDate::ref_from_bytes(payload).map_err(Error::from_debug)?;
            Ok(date.to_date()?.and_time(NaiveTime::MIN))
        }
        TypeCode::Time => {
            let time = WireTime::ref_from_bytes(payload).map_err(Error::from_debug)?;
            Ok(time_only(time.to_time()?))
        }
        TypeCode::Timestamp => {
            let ts = WireTimestamp::ref_from_bytes(payload).map_err(Error::from_debug)?;
            Ok(ts.date.to_date()?.and_time(ts.time.to_time()?))
        }
        TypeCode::Longdate => {
            let ticks = read_i64(payload)?.checked_sub(1).ok_or(Error::InvalidPacket)?;
            let secs = ticks.div_euclid(TICKS_PER_SECOND);
            let nanos = ticks.rem_euclid(TICKS_PER_SECOND) * 100;
            let dt = add(epoch(), TimeDelta::try_seconds(secs))?;
            add(dt, Some(TimeDelta::nanoseconds(nanos)))
        }
        TypeCode::Seconddate => {
            let secs = read_i64(payload)?.checked_sub(1).ok_or(Error::InvalidPacket)?;
            add(epoch(), TimeDelta::try_seconds(secs))
        }
        TypeCode::Daydate => {
            let days = read_i32(payload)?;
            let date = NaiveDate::from_num_days_from_ce_opt(days).ok_or(Error::InvalidPacket)?;
            Ok(date.and_time(NaiveTime::MIN))
        }
        TypeCode::Secondtime => {
            let secs = read_i32(payload)?.checked_sub(1).ok_or(Error::InvalidPacket)?;
            let secs = u32::try_from(secs).map_err(|_| Error::InvalidPacket)?;
            let time =
                NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).ok_or(Error::InvalidPacket)?;
            Ok(time_only(time))
        }
        tc => Err(Error::BadUsageError(format!(
            "Cannot decode {} as a date/time",
            tc.type_name()
        ))),
    }
}

/// Round to a multiple of `unit_nanos`, half away from zero, carrying into
/// seconds, days and years.
pub fn round_to(dt: NaiveDateTime, unit_nanos: u32) -> Result<NaiveDateTime> {
    let half = TimeDelta::nanoseconds(i64::from(unit_nanos / 2));
    let shifted = dt
        .checked_add_signed(half)
        .ok_or_else(|| Error::BadUsageError(format!("{dt} out of range")))?;
    let nanos = shifted.nanosecond();
    shifted
        .with_nanosecond(nanos - nanos % unit_nanos)
        .ok_or_else(|| Error::BadUsageError(format!("{dt} out of range")))
}

/// Encode a temporal parameter payload, rounded to the resolution of `tc`
pub fn encode(tc: TypeCode, dt: NaiveDateTime, out: &mut Vec<u8>) -> Result<()> {
    match tc {
        TypeCode::Date => {
            out.extend_from_slice(WireDate::from_date(dt.date())?.as_bytes());
        }
        TypeCode::Daydate => {
            out.extend_from_slice(&dt.date().num_days_from_ce().to_le_bytes());
        }
        TypeCode::Time => {
            let dt = round_to(dt, 1_000_000)?;
            out.extend_from_slice(WireTime::from_time(dt.time()).as_bytes());
        }
        TypeCode::Timestamp => {
            let dt = round_to(dt, 1_000_000)?;
            let ts = WireTimestamp {
                date: WireDate::from_date(dt.date())?,
                time: WireTime::from_time(dt.time()),
            };
            out.extend_from_slice(ts.as_bytes());
        }
        TypeCode::Longdate => {
            let delta = round_to(dt, 100)? - epoch();
            let ticks = delta.num_seconds() * TICKS_PER_SECOND + i64::from(delta.subsec_nanos() / 100);
            out.extend_from_slice(&(ticks + 1).to_le_bytes());
        }
        TypeCode::Seconddate => {
            let delta = round_to(dt, 1_000_000_000)? - epoch();
            out.extend_from_slice(&(delta.num_seconds() + 1).to_le_bytes());
        }
        TypeCode::Secondtime => {
            let time = round_to(dt, 1_000_000_000)?.time();
            let secs = time.num_seconds_from_midnight() as i32;
            out.extend_from_slice(&(secs + 1).to_le_bytes());
        }
        tc => {
            return Err(Error::BadUsageError(format!(
                "Cannot encode a date/time as {}",
                tc.type_name()
            )));
        }
    }
    Ok(())
}
