//! `RecordReader`'s lenient mode: a corrupt record is skipped, in-memory,
//! without aborting the rest of the stream; fail-fast mode aborts on the
//! same input.

use chrono::{TimeZone, Utc};
use mseed_core::{
    DataEncoding, EncodedTimeseries, ExtraHeaders, MSeed3Header, MSeed3Record, MSeedError,
    ReadOptions, RecordReader, SourceId, SourceIdentifier,
};
use std::io::{BufReader, BufWriter};

fn make_record(station: &str, num_samples: usize) -> Result<MSeed3Record, MSeedError> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let header = MSeed3Header::new(start, DataEncoding::INT32, 10.0, num_samples);
    let identifier = SourceIdentifier::Fdsn(SourceId::new("XX", station, "", "L", "H", "Z")?);
    let samples: Vec<i32> = (0..num_samples as i32).collect();
    Ok(MSeed3Record::new(
        header,
        identifier,
        ExtraHeaders::new(),
        EncodedTimeseries::Int32(samples),
    ))
}

fn write_record(record: &mut MSeed3Record) -> Result<Vec<u8>, MSeedError> {
    let mut out = Vec::new();
    {
        let mut buf_writer = BufWriter::new(&mut out);
        record.write_to(&mut buf_writer)?;
    }
    Ok(out)
}

#[test]
fn lenient_reader_skips_corrupt_record_and_continues() -> Result<(), MSeedError> {
    let mut good_a = make_record("AAAA", 5)?;
    let mut bad = make_record("BBBB", 5)?;
    let mut good_b = make_record("CCCC", 5)?;

    let mut stream = write_record(&mut good_a)?;
    let mut corrupt = write_record(&mut bad)?;
    let payload_offset = corrupt.len() - bad.encoded_data.byte_len() as usize;
    corrupt[payload_offset] ^= 0xFF; // flips a data byte, breaking the CRC
    stream.extend_from_slice(&corrupt);
    stream.extend_from_slice(&write_record(&mut good_b)?);

    let reader = BufReader::new(&stream[..]);
    let options = ReadOptions {
        lenient: true,
        ..ReadOptions::default()
    };
    let records: Vec<MSeed3Record> = RecordReader::with_options(reader, options)
        .collect::<Result<_, _>>()?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].identifier.to_string(), "FDSN:XX_AAAA__L_H_Z");
    assert_eq!(records[1].identifier.to_string(), "FDSN:XX_CCCC__L_H_Z");
    Ok(())
}

#[test]
fn strict_reader_aborts_on_first_corrupt_record() -> Result<(), MSeedError> {
    let mut good = make_record("AAAA", 5)?;
    let mut bad = make_record("BBBB", 5)?;

    let mut stream = write_record(&mut good)?;
    let mut corrupt = write_record(&mut bad)?;
    let payload_offset = corrupt.len() - bad.encoded_data.byte_len() as usize;
    corrupt[payload_offset] ^= 0xFF;
    stream.extend_from_slice(&corrupt);

    let reader = BufReader::new(&stream[..]);
    let mut records = RecordReader::new(reader);
    assert!(records.next().unwrap().is_ok());
    let err = records.next().unwrap().unwrap_err();
    assert!(matches!(err, MSeedError::CrcMismatch(_, _)));
    assert!(records.next().is_none());
    Ok(())
}
