//! The 48-byte MiniSEED v2 fixed header, per the SEED manual's "fixed
//! section of data header". Unlike v3 this section is big-endian and packs
//! the station identity fields as fixed-width ASCII rather than a single
//! source identifier string.

use std::convert::TryInto;

use crate::mseed_error::MSeedError;
use crate::seed_time::BTime;

pub const FIXED_HEADER_SIZE: usize = 48;

#[derive(Debug, Clone)]
pub struct V2Header {
    pub sequence_number: String,
    pub quality_indicator: char,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub network: String,
    pub start_time: BTime,
    pub num_samples: u16,
    pub sample_rate_factor: i16,
    pub sample_rate_multiplier: i16,
    pub activity_flags: u8,
    pub io_clock_flags: u8,
    pub data_quality_flags: u8,
    pub num_blockettes: u8,
    pub time_correction: i32,
    pub beginning_of_data: u16,
    pub first_blockette_offset: u16,
}

impl V2Header {
    /// Nominal sample rate in Hz from `sampleRateFactor`/`sampleRateMultiplier`
    /// per the standard BTIME formula. Superseded by blockette 100 when present.
    pub fn computed_sample_rate(&self) -> f64 {
        let factor = self.sample_rate_factor as f64;
        let multiplier = self.sample_rate_multiplier as f64;
        if factor == 0.0 || multiplier == 0.0 {
            return 0.0;
        }
        let rate = if factor > 0.0 { factor } else { 1.0 / -factor };
        if multiplier > 0.0 {
            rate * multiplier
        } else {
            rate / -multiplier
        }
    }
}

impl TryFrom<&[u8; FIXED_HEADER_SIZE]> for V2Header {
    type Error = MSeedError;

    fn try_from(buf: &[u8; FIXED_HEADER_SIZE]) -> Result<Self, Self::Error> {
        let sequence_number = fixed_ascii(&buf[0..6]);
        let quality_indicator = buf[6] as char;
        // buf[7] reserved
        let station = fixed_ascii(&buf[8..13]);
        let location = fixed_ascii(&buf[13..15]);
        let channel = fixed_ascii(&buf[15..18]);
        let network = fixed_ascii(&buf[18..20]);
        let btime_bytes: [u8; 10] = buf[20..30].try_into().unwrap();
        let start_time = BTime::from_be_bytes(&btime_bytes);
        let num_samples = u16::from_be_bytes([buf[30], buf[31]]);
        let sample_rate_factor = i16::from_be_bytes([buf[32], buf[33]]);
        let sample_rate_multiplier = i16::from_be_bytes([buf[34], buf[35]]);
        let activity_flags = buf[36];
        let io_clock_flags = buf[37];
        let data_quality_flags = buf[38];
        let num_blockettes = buf[39];
        let time_correction = i32::from_be_bytes([buf[40], buf[41], buf[42], buf[43]]);
        let beginning_of_data = u16::from_be_bytes([buf[44], buf[45]]);
        let first_blockette_offset = u16::from_be_bytes([buf[46], buf[47]]);
        Ok(V2Header {
            sequence_number,
            quality_indicator,
            station,
            location,
            channel,
            network,
            start_time,
            num_samples,
            sample_rate_factor,
            sample_rate_multiplier,
            activity_flags,
            io_clock_flags,
            data_quality_flags,
            num_blockettes,
            time_correction,
            beginning_of_data,
            first_blockette_offset,
        })
    }
}

/// Trims trailing spaces and nul padding from a fixed-width SEED ASCII field.
fn fixed_ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(' ')
        .trim_end_matches('\0')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_header_bytes() -> [u8; FIXED_HEADER_SIZE] {
        let mut buf = [b' '; FIXED_HEADER_SIZE];
        buf[0..6].copy_from_slice(b"000001");
        buf[6] = b'D';
        buf[8..13].copy_from_slice(b"TEST ");
        buf[13..15].copy_from_slice(b"00");
        buf[15..18].copy_from_slice(b"BHZ");
        buf[18..20].copy_from_slice(b"XX");
        // BTIME: year 2012, doy 1, 00:00:00.0000
        buf[20..22].copy_from_slice(&2012u16.to_be_bytes());
        buf[22..24].copy_from_slice(&1u16.to_be_bytes());
        buf[24] = 0;
        buf[25] = 0;
        buf[26] = 0;
        buf[27] = 0;
        buf[28..30].copy_from_slice(&0u16.to_be_bytes());
        buf[30..32].copy_from_slice(&500u16.to_be_bytes());
        buf[32..34].copy_from_slice(&1i16.to_be_bytes());
        buf[34..36].copy_from_slice(&1i16.to_be_bytes());
        buf[36] = 0;
        buf[37] = 0;
        buf[38] = 0;
        buf[39] = 2;
        buf[40..44].copy_from_slice(&0i32.to_be_bytes());
        buf[44..46].copy_from_slice(&64u16.to_be_bytes());
        buf[46..48].copy_from_slice(&48u16.to_be_bytes());
        buf
    }

    #[test]
    fn parses_fixed_ascii_fields() -> Result<(), MSeedError> {
        let buf = dummy_header_bytes();
        let head = V2Header::try_from(&buf)?;
        assert_eq!(head.sequence_number, "000001");
        assert_eq!(head.quality_indicator, 'D');
        assert_eq!(head.station, "TEST");
        assert_eq!(head.location, "00");
        assert_eq!(head.channel, "BHZ");
        assert_eq!(head.network, "XX");
        assert_eq!(head.num_samples, 500);
        Ok(())
    }

    #[test]
    fn computes_sample_rate_from_factor_and_multiplier() -> Result<(), MSeedError> {
        let buf = dummy_header_bytes();
        let head = V2Header::try_from(&buf)?;
        assert!((head.computed_sample_rate() - 1.0).abs() < f64::EPSILON);
        Ok(())
    }
}
