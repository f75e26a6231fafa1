
use byteorder::{LittleEndian, WriteBytesExt};
use crc::{Crc, CRC_32_ISCSI};
use std::convert::TryFrom;
use std::fmt;
use std::io::prelude::*;
use std::io::BufWriter;

use crate::data_encoding::DataEncoding;
use crate::encoded_timeseries::EncodedTimeseries;
use crate::extra_headers::ExtraHeaders;
use crate::header::{MSeed3Header, CRC_OFFSET, FIXED_HEADER_SIZE};
use crate::mseed_error::MSeedError;
use crate::source_id::SourceIdentifier;

pub const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// A fully decoded miniSEED3 record: fixed header, source identifier, extra
/// header JSON tree and timeseries payload.
#[derive(Debug)]
pub struct MSeed3Record {
    pub header: MSeed3Header,
    pub identifier: SourceIdentifier,
    pub extra_headers: ExtraHeaders,
    pub encoded_data: EncodedTimeseries,
}

impl MSeed3Record {
    pub fn new(
        header: MSeed3Header,
        identifier: SourceIdentifier,
        extra_headers: ExtraHeaders,
        encoded_data: EncodedTimeseries,
    ) -> MSeed3Record {
        let mut header = header;
        let extra_headers_length = extra_header_wire_len(&extra_headers);
        header.recalculated_lengths(
            identifier.calc_len(),
            extra_headers_length,
            encoded_data.byte_len(),
            encoded_data.reconcile_num_samples(header.num_samples),
        );
        MSeed3Record {
            header,
            identifier,
            extra_headers,
            encoded_data,
        }
    }

    /// Reads a single record, verifying its CRC32C against the header value.
    /// Payload bytes are kept raw; call [`MSeed3Record::decode_samples`] to
    /// materialize typed samples.
    pub fn from_reader<R: BufRead>(buf_reader: &mut R) -> Result<MSeed3Record, MSeedError> {
        let raw = RawMSeed3Record::from_reader(buf_reader)?;
        raw.into_record()
    }

    /// Decodes the payload into typed samples per the header's encoding,
    /// replacing a `Raw` payload in place. A no-op if already decoded.
    pub fn decode_samples(&mut self) -> Result<(), MSeedError> {
        if let EncodedTimeseries::Raw(bytes) = &self.encoded_data {
            self.encoded_data =
                EncodedTimeseries::decode(bytes, self.header.encoding, self.header.num_samples)?;
        }
        Ok(())
    }

    /// Writes the record, after calculating the CRC. The returned tuple contains the number
    /// of bytes written and the CRC value.
    /// This does recalculate the identifier length, extra headers length and data length headers.
    /// The number of samples is sanity checked against the data, but trusts the header in cases
    /// of compressed or opaque data.
    pub fn write_to<W>(&mut self, buf: &mut BufWriter<W>) -> Result<(u32, u32), MSeedError>
    where
        W: std::io::Write,
    {
        self.header.crc = 0;
        let mut out = Vec::new();
        {
            let mut inner_buf = BufWriter::new(&mut out);
            self.write_to_wocrc(&mut inner_buf)?;
            inner_buf.flush()?;
        }
        let crc = CASTAGNOLI.checksum(&out);
        self.header.crc = crc;
        buf.write_all(&out[0..CRC_OFFSET])?;
        buf.write_u32::<LittleEndian>(crc)?;
        buf.write_all(&out[(CRC_OFFSET + 4)..])?;
        Ok((out.len() as u32, crc))
    }

    /// Writes the record to the given buffer without checking, calculating or setting the header CRC field.
    /// This does recalculate the identifier length, extra headers length and data length headers.
    /// The number of samples is sanity checked against the data, but trusts the header in cases
    /// of compressed or opaque data.
    pub fn write_to_wocrc<W>(&mut self, buf: &mut BufWriter<W>) -> Result<(), MSeedError>
    where
        W: std::io::Write,
    {
        let id_bytes = self.identifier.as_bytes();
        let identifier_length = id_bytes.len() as u8;
        let data_length = self.encoded_data.byte_len();
        let num_samples = self
            .encoded_data
            .reconcile_num_samples(self.header.num_samples);
        let extra_headers_length = extra_header_wire_len(&self.extra_headers);
        let eh_str = self.extra_headers.to_string();

        self.header.recalculated_lengths(
            identifier_length,
            extra_headers_length,
            data_length,
            num_samples,
        );
        self.header.write_to(buf)?;
        buf.write_all(&id_bytes)?;
        if extra_headers_length > 0 {
            // don't write bytes for an empty object, e.g. `{}`
            buf.write_all(eh_str.as_bytes())?;
        }
        self.encoded_data.write_to(buf)?;
        buf.flush()?;
        Ok(())
    }

    pub fn get_record_size(&self) -> u32 {
        self.header.get_record_size()
    }
}

/// Byte length of the extra-header JSON as it would be written, treating an
/// empty object (`{}`, 2 bytes) the same as absent.
fn extra_header_wire_len(eh: &ExtraHeaders) -> u16 {
    let len = eh.to_string().len();
    if len > 2 {
        len as u16
    } else {
        0
    }
}

impl fmt::Display for MSeed3Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "  {}, {}", self.identifier, self.header)
    }
}

/// Applies `f` to the extra headers of every record, collecting each
/// result. Errors for one record do not abort iteration over the rest,
/// matching `getAll`/`setAll`/`deleteAll` semantics.
fn for_each_extra_header<T>(
    records: &mut [MSeed3Record],
    mut f: impl FnMut(&mut ExtraHeaders) -> Result<T, MSeedError>,
) -> Vec<Result<T, MSeedError>> {
    records.iter_mut().map(|r| f(&mut r.extra_headers)).collect()
}

/// `get(path)` applied to every record in sequence. A missing path in any
/// one record is carried as `Ok(None)`, not an error, and does not stop
/// iteration over the rest.
pub fn get_all(records: &mut [MSeed3Record], pointer: &str) -> Vec<Result<Option<serde_json::Value>, MSeedError>> {
    for_each_extra_header(records, |eh| eh.get(pointer))
}

/// `set(path, value)` applied to every record in sequence.
pub fn set_all(
    records: &mut [MSeed3Record],
    pointer: &str,
    value: serde_json::Value,
) -> Vec<Result<(), MSeedError>> {
    for_each_extra_header(records, |eh| eh.set(pointer, value.clone()))
}

/// `delete(path)` applied to every record in sequence.
pub fn delete_all(records: &mut [MSeed3Record], pointer: &str) -> Vec<Result<serde_json::Value, MSeedError>> {
    for_each_extra_header(records, |eh| eh.delete(pointer))
}

/// A record whose identifier, extra headers and payload are kept as raw
/// bytes. The CRC is still verified on read. Useful for scanning or
/// filtering a stream before paying the cost of identifier parsing, JSON
/// parsing or sample decoding for every record.
#[derive(Debug, Clone)]
pub struct RawMSeed3Record {
    pub header: MSeed3Header,
    pub identifier_bytes: Vec<u8>,
    pub extra_headers_bytes: Vec<u8>,
    pub data_bytes: Vec<u8>,
}

impl RawMSeed3Record {
    pub fn from_reader<R: BufRead>(buf_reader: &mut R) -> Result<RawMSeed3Record, MSeedError> {
        let mut buffer = [0; FIXED_HEADER_SIZE];
        let n = buf_reader
            .by_ref()
            .take(FIXED_HEADER_SIZE as u64)
            .read(&mut buffer)?;
        if n < FIXED_HEADER_SIZE {
            return Err(MSeedError::TruncatedRecord(FIXED_HEADER_SIZE - n));
        }
        let header = MSeed3Header::try_from(&buffer)?;
        // zero the crc field for the checksum; the header already captured it
        buffer[CRC_OFFSET] = 0;
        buffer[CRC_OFFSET + 1] = 0;
        buffer[CRC_OFFSET + 2] = 0;
        buffer[CRC_OFFSET + 3] = 0;
        let mut digest = CASTAGNOLI.digest();
        digest.update(&buffer);

        let mut identifier_bytes = Vec::new();
        read_exact_n(buf_reader, header.raw_identifier_length() as usize, &mut identifier_bytes)?;
        digest.update(&identifier_bytes);

        let mut extra_headers_bytes = Vec::new();
        read_exact_n(
            buf_reader,
            header.raw_extra_headers_length() as usize,
            &mut extra_headers_bytes,
        )?;
        digest.update(&extra_headers_bytes);

        let expected_data_length = match header.encoding {
            DataEncoding::INT16 => 2 * header.num_samples,
            DataEncoding::INT32 => 4 * header.num_samples,
            DataEncoding::FLOAT32 => 4 * header.num_samples,
            DataEncoding::FLOAT64 => 8 * header.num_samples,
            _ => header.raw_data_length(),
        };
        if header.raw_data_length() != expected_data_length {
            return Err(MSeedError::DataLength(
                expected_data_length,
                header.num_samples,
                header.encoding.value(),
                header.raw_data_length(),
            ));
        }

        let mut data_bytes = Vec::new();
        read_exact_n(buf_reader, header.raw_data_length() as usize, &mut data_bytes)?;
        digest.update(&data_bytes);

        let crc_calc = digest.finalize();
        if crc_calc != header.crc {
            return Err(MSeedError::CrcMismatch(crc_calc, header.crc));
        }

        Ok(RawMSeed3Record {
            header,
            identifier_bytes,
            extra_headers_bytes,
            data_bytes,
        })
    }

    /// Parses the identifier and extra headers and wraps the payload as an
    /// undecoded [`EncodedTimeseries::Raw`].
    pub fn into_record(self) -> Result<MSeed3Record, MSeedError> {
        let identifier = SourceIdentifier::try_from(self.identifier_bytes)?;
        let extra_headers = if self.extra_headers_bytes.is_empty() {
            ExtraHeaders::new()
        } else {
            ExtraHeaders::from(String::from_utf8(self.extra_headers_bytes)?)
        };
        Ok(MSeed3Record {
            header: self.header,
            identifier,
            extra_headers,
            encoded_data: EncodedTimeseries::Raw(self.data_bytes),
        })
    }
}

fn read_exact_n<R: BufRead>(buf_reader: &mut R, n: usize, out: &mut Vec<u8>) -> Result<(), MSeedError> {
    let read = buf_reader.by_ref().take(n as u64).read_to_end(out)?;
    if read < n {
        return Err(MSeedError::TruncatedRecord(n - read));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_id::SourceId;
    use std::io::BufReader;

    fn sample_record() -> MSeed3Record {
        let header = MSeed3Header::new(
            chrono::Utc::now(),
            DataEncoding::INT32,
            100.0,
            6,
        );
        let identifier = SourceIdentifier::Fdsn(
            SourceId::new("XX", "TEST", "", "L", "H", "Z").unwrap(),
        );
        let extra_headers = ExtraHeaders::new();
        let encoded_data = EncodedTimeseries::Int32(vec![0, -1, 2, -3, 4, -5]);
        MSeed3Record::new(header, identifier, extra_headers, encoded_data)
    }

    #[test]
    fn record_round_trip() -> Result<(), MSeedError> {
        let mut rec = sample_record();
        let mut out = Vec::new();
        let (bytes_written, _crc) = {
            let mut buf_writer = BufWriter::new(&mut out);
            let t = rec.write_to(&mut buf_writer)?;
            buf_writer.flush()?;
            t
        };
        assert_eq!(rec.get_record_size(), out.len() as u32);
        assert_eq!(bytes_written, out.len() as u32);

        let mut reader = BufReader::new(&out[..]);
        let mut read_back = MSeed3Record::from_reader(&mut reader)?;
        read_back.decode_samples()?;
        match read_back.encoded_data {
            EncodedTimeseries::Int32(v) => assert_eq!(v, vec![0, -1, 2, -3, 4, -5]),
            other => panic!("expected Int32, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn crc_tamper_is_detected() -> Result<(), MSeedError> {
        let mut rec = sample_record();
        let mut out = Vec::new();
        {
            let mut buf_writer = BufWriter::new(&mut out);
            rec.write_to(&mut buf_writer)?;
        }
        let payload_offset = rec.get_record_size() as usize - rec.encoded_data.byte_len() as usize;
        out[payload_offset] ^= 0xFF;
        let mut reader = BufReader::new(&out[..]);
        let err = MSeed3Record::from_reader(&mut reader).unwrap_err();
        assert!(matches!(err, MSeedError::CrcMismatch(_, _)));

        out[payload_offset] ^= 0xFF;
        let mut reader = BufReader::new(&out[..]);
        assert!(MSeed3Record::from_reader(&mut reader).is_ok());
        Ok(())
    }

    #[test]
    fn extra_header_batch_ops() -> Result<(), MSeedError> {
        let mut records = vec![sample_record(), sample_record()];
        let results = set_all(&mut records, "/FDSN/Time/Quality", serde_json::json!(80));
        assert!(results.iter().all(|r| r.is_ok()));
        let gotten = get_all(&mut records, "/FDSN/Time/Quality");
        assert_eq!(gotten.len(), 2);
        for g in gotten {
            assert_eq!(g?, Some(serde_json::json!(80)));
        }
        Ok(())
    }
}
