//! Converts a decoded MiniSEED v2 record into the v3 record model this
//! library otherwise operates on. Per spec, samples are never
//! decompressed/recompressed here; only the byte order of primitive arrays
//! may change. Lossy with respect to blockettes this library does not
//! interpret (spec.md §9 open question): only 100/1000/1001 inform the
//! conversion, everything else is dropped.

use crate::data_encoding::DataEncoding;
use crate::encoded_timeseries::EncodedTimeseries;
use crate::extra_headers::ExtraHeaders;
use crate::header::MSeed3Header;
use crate::mseed_error::MSeedError;
use crate::primitive_codec;
use crate::record::MSeed3Record;
use crate::source_id::{SourceId, SourceIdentifier};
use crate::v2::V2Record;

/// Builds the FDSN source identifier `FDSN:NET_STA_LOC_B_S_X` from a v2
/// record's network/station/location/channel fields, decomposing the
/// 3-character channel code into band/source/subsource.
fn source_identifier(v2: &V2Record) -> SourceIdentifier {
    let channel = &v2.header.channel;
    let mut chars = channel.chars();
    let band = chars.next().map(String::from).unwrap_or_default();
    let source = chars.next().map(String::from).unwrap_or_default();
    let subsource = chars.next().map(String::from).unwrap_or_default();
    match SourceId::new(
        &v2.header.network,
        &v2.header.station,
        &v2.header.location,
        &band,
        &source,
        &subsource,
    ) {
        Ok(sid) => SourceIdentifier::Fdsn(sid),
        Err(_) => SourceIdentifier::Raw(format!(
            "FDSN:{}_{}_{}_{}_{}_{}",
            v2.header.network, v2.header.station, v2.header.location, band, source, subsource
        )),
    }
}

/// Converts a v2 record to its v3 equivalent. See spec.md §4.6.
pub fn convert(v2: &V2Record) -> Result<MSeed3Record, MSeedError> {
    let microsecond_offset = v2
        .data_extension_blockette()
        .map(|b| b.microsecond_offset as i32)
        .unwrap_or(0);
    // `start_time.to_utc()` already folds in tenth-millisecond precision as
    // nanoseconds; adding the microsecond offset on top reproduces the
    // combined formula `tenth_ms * 1e5 + micros * 1e3` exactly.
    let start = v2.header.start_time.to_utc() + chrono::Duration::nanoseconds(microsecond_offset as i64 * 1_000);

    let sample_rate = v2.effective_sample_rate();
    let encoding_id = v2
        .data_only_blockette()
        .map(|b| b.encoding)
        .unwrap_or(0);
    let encoding = DataEncoding::from_int(encoding_id);
    let big_endian = v2.data_only_blockette().map(|b| b.word_order_big_endian).unwrap_or(true);

    let payload = if big_endian {
        match encoding.primitive_byte_width() {
            Some(width) => primitive_codec::swap_byte_order(&v2.encoded_data, width as usize),
            None => v2.encoded_data.clone(),
        }
    } else {
        v2.encoded_data.clone()
    };

    let mut header = MSeed3Header::new(start, encoding, sample_rate, v2.header.num_samples as usize);
    header.publication_version = 1;

    let mut extra_headers = ExtraHeaders::new();
    if let Some(b1001) = v2.data_extension_blockette() {
        extra_headers.set("/FDSN/Time/Quality", serde_json::json!(b1001.timing_quality))?;
    }
    if v2.header.quality_indicator != ' ' {
        extra_headers.set(
            "/FDSN/DataQuality",
            serde_json::json!(v2.header.quality_indicator.to_string()),
        )?;
    }

    let identifier = source_identifier(v2);
    let encoded_data = EncodedTimeseries::Raw(payload);

    Ok(MSeed3Record::new(header, identifier, extra_headers, encoded_data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::v2::blockette::{Blockette, DataExtensionBlockette, DataOnlyBlockette};
    use crate::v2::header::V2Header;
    use crate::seed_time::BTime;

    fn sample_v2() -> V2Record {
        let header = V2Header {
            sequence_number: String::from("000001"),
            quality_indicator: 'D',
            station: String::from("TEST"),
            location: String::from("00"),
            channel: String::from("BHZ"),
            network: String::from("XX"),
            start_time: BTime {
                year: 2012,
                day_of_year: 1,
                hour: 0,
                minute: 0,
                second: 0,
                tenth_millisecond: 4680,
            },
            num_samples: 2,
            sample_rate_factor: 40,
            sample_rate_multiplier: 1,
            activity_flags: 0,
            io_clock_flags: 0,
            data_quality_flags: 0,
            num_blockettes: 2,
            time_correction: 0,
            beginning_of_data: 64,
            first_blockette_offset: 48,
        };
        V2Record {
            header,
            blockettes: vec![
                Blockette::DataOnly(DataOnlyBlockette {
                    encoding: 11,
                    word_order_big_endian: true,
                    record_length_exponent: 12,
                }),
                Blockette::DataExtension(DataExtensionBlockette {
                    timing_quality: 80,
                    microsecond_offset: 250,
                    frame_count: 1,
                }),
            ],
            encoded_data: vec![0u8; 64],
        }
    }

    #[test]
    fn converts_time_and_quality_per_scenario_3() -> Result<(), MSeedError> {
        let v2 = sample_v2();
        let rec = convert(&v2)?;
        // scenario 3: tenth-ms=4680, micros=250 -> nanosecond field = 468_250_000
        assert_eq!(rec.header.nanosecond, 468_250_000);
        let mut extra_headers = rec.extra_headers.clone();
        let quality = extra_headers.get("/FDSN/Time/Quality")?;
        assert_eq!(quality, Some(serde_json::json!(80)));
        Ok(())
    }

    #[test]
    fn converts_identifier_from_channel_parts() -> Result<(), MSeedError> {
        let rec = convert(&sample_v2())?;
        assert_eq!(rec.identifier.to_string(), "FDSN:XX_TEST_00_B_H_Z");
        Ok(())
    }
}
