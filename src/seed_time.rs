//! Conversions between calendar time, the v2 packed BTIME, and the v3
//! packed (year, day-of-year, h:m:s, nanosecond) representation.
//!
//! Leap seconds are carried verbatim: `second` may equal 60, and minute
//! length is treated as a constant 60 seconds. This library does not
//! attempt to renormalize across a UTC leap-second boundary.

use chrono::prelude::*;
use chrono::Utc;

/// The 10-byte SEED BTIME structure used by MiniSEED v2 fixed headers.
/// Encoded big-endian in the record; this struct holds the decoded fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTime {
    pub year: u16,
    pub day_of_year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub tenth_millisecond: u16,
}

impl BTime {
    pub const ENCODED_SIZE: usize = 10;

    /// Decodes a BTIME from its 10 big-endian bytes: year(u16), day-of-year
    /// (u16), hour, minute, second, an unused alignment byte, then
    /// tenth-of-millisecond (u16).
    pub fn from_be_bytes(buf: &[u8; 10]) -> BTime {
        BTime {
            year: u16::from_be_bytes([buf[0], buf[1]]),
            day_of_year: u16::from_be_bytes([buf[2], buf[3]]),
            hour: buf[4],
            minute: buf[5],
            second: buf[6],
            // buf[7] is the unused alignment byte
            tenth_millisecond: u16::from_be_bytes([buf[8], buf[9]]),
        }
    }

    /// Converts to a nanosecond-precision UTC instant. A leap second
    /// (`second == 60`) is passed through to `chrono`, which accepts it as
    /// the leap-second representation of the following instant.
    pub fn to_utc(&self) -> DateTime<Utc> {
        let nanosecond = self.tenth_millisecond as u32 * 100_000;
        Utc.yo(self.year as i32, self.day_of_year as u32)
            .and_hms_nano(self.hour as u32, self.minute as u32, self.second as u32, nanosecond)
    }

    /// Adds a microsecond offset (as carried by v2 blockette 1001) to this
    /// BTIME's instant, producing a nanosecond-precision instant.
    pub fn to_utc_with_micros(&self, microsecond_offset: i32) -> DateTime<Utc> {
        self.to_utc() + chrono::Duration::microseconds(microsecond_offset as i64)
    }
}

/// Decomposes a UTC instant into the fields of the v3 packed header time:
/// year, day-of-year, hour, minute, second (0-60 inclusive to allow a leap
/// second) and nanosecond (0..1_000_000_000).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedTime {
    pub year: u16,
    pub day_of_year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub nanosecond: u32,
}

impl PackedTime {
    pub fn from_utc(start: DateTime<Utc>) -> PackedTime {
        let date = start.date();
        let time = start.time();
        PackedTime {
            year: date.year() as u16,
            day_of_year: date.ordinal() as u16,
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            // chrono folds a leap second into `nanosecond() >= 1_000_000_000`;
            // unfold it back into second==60 rather than normalizing away.
            second: (time.second() + time.nanosecond() / 1_000_000_000) as u8,
            nanosecond: time.nanosecond() % 1_000_000_000,
        }
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        Utc.yo(self.year as i32, self.day_of_year as u32).and_hms_nano(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            self.nanosecond,
        )
    }
}

/// Sample period in seconds from the header's `sample_rate_period` field:
/// positive values are samples/second, negative values are seconds/sample.
pub fn sample_period_seconds(sample_rate_period: f64) -> f64 {
    if sample_rate_period > 0.0 {
        1.0 / sample_rate_period
    } else {
        -sample_rate_period
    }
}

/// The start time of the sample at `index` within a record starting at
/// `start`, sampled at `sample_rate_period` (same sign convention as the
/// header field). Exact in rational arithmetic, rounded to the nearest
/// nanosecond for representation.
pub fn sample_start_time(start: DateTime<Utc>, sample_rate_period: f64, index: u64) -> DateTime<Utc> {
    let period = sample_period_seconds(sample_rate_period);
    let offset_nanos = (period * index as f64 * 1.0e9).round() as i64;
    start + chrono::Duration::nanoseconds(offset_nanos)
}

/// Composes the v3 nanosecond field from a v2 BTIME tenth-millisecond value
/// and a blockette-1001 microsecond offset, per the v2->v3 conversion rule:
/// `nanosecond = tenth_ms * 1e5 + micros * 1e3`.
pub fn nanos_from_tenth_milli_and_micros(tenth_millisecond: u16, microsecond_offset: i32) -> i64 {
    tenth_millisecond as i64 * 100_000 + microsecond_offset as i64 * 1_000
}
