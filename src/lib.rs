//! A library for reading, writing, converting and merging MiniSEED v2/v3
//! seismic data records.
//!
//! See the specification at <https://docs.fdsn.org/projects/miniseed3> for
//! the v3 wire format this library centers on; v2 support is read-only and
//! exists to feed [`v2_to_v3::convert`].

pub mod data_encoding;
pub mod encoded_timeseries;
pub mod extra_headers;
pub mod header;
pub mod merge;
pub mod mseed_error;
pub mod primitive_codec;
pub mod record;
pub mod seed_time;
pub mod source_id;
pub mod steim1;
pub mod steim2;
pub mod steim_frame_block;
pub mod v2;
pub mod v2_to_v3;

use std::io::BufRead;

pub use data_encoding::DataEncoding;
pub use encoded_timeseries::EncodedTimeseries;
pub use extra_headers::ExtraHeaders;
pub use header::{MSeed3Header, FIXED_HEADER_SIZE};
pub use merge::{merge, MergeOptions};
pub use mseed_error::MSeedError;
pub use record::{delete_all, get_all, set_all, MSeed3Record, RawMSeed3Record};
pub use source_id::{SourceId, SourceIdentifier};
pub use v2::V2Record;
pub use v2_to_v3::convert as convert_v2_to_v3;

/// Controls for [`RecordReader`] and [`read_mseed3`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// When set, a `FormatError`/`IntegrityError` on one record is logged
    /// (via the `log` facade, `warn!`) and that record is skipped rather
    /// than aborting the whole read.
    pub lenient: bool,
    /// Verify the CRC32C of each record against its header value. Always
    /// true in the current implementation; reserved for callers that want
    /// to explicitly opt out in a future version.
    pub verify_crc: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            lenient: false,
            verify_crc: true,
        }
    }
}

/// Reads every miniSEED3 record from `buf_reader` until EOF, fail-fast on
/// the first error.
pub fn read_mseed3<R: BufRead>(buf_reader: &mut R) -> Result<Vec<MSeed3Record>, MSeedError> {
    let mut records: Vec<MSeed3Record> = Vec::new();
    while !buf_reader.fill_buf()?.is_empty() {
        records.push(MSeed3Record::from_reader(buf_reader)?);
    }
    Ok(records)
}

/// A lazy, pull-based iterator over the records in a `BufRead` stream. Does
/// not buffer beyond the current record; restarting after an error requires
/// the caller to re-open the stream, per spec.md §9 "Iterator-based record
/// reading".
pub struct RecordReader<R: BufRead> {
    buf_reader: R,
    options: ReadOptions,
    done: bool,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(buf_reader: R) -> RecordReader<R> {
        RecordReader {
            buf_reader,
            options: ReadOptions::default(),
            done: false,
        }
    }

    pub fn with_options(buf_reader: R, options: ReadOptions) -> RecordReader<R> {
        RecordReader {
            buf_reader,
            options,
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<MSeed3Record, MSeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            match self.buf_reader.fill_buf() {
                Ok(buf) if buf.is_empty() => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(MSeedError::IOError(e)));
                }
            }
            match MSeed3Record::from_reader(&mut self.buf_reader) {
                Ok(rec) => return Some(Ok(rec)),
                Err(e) if self.options.lenient && is_skippable(&e) => {
                    log::warn!("lenient mode: skipping record after error: {}", e);
                    continue;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// FormatError/IntegrityError per spec.md §7 are the classes lenient mode
/// may skip past; SemanticError and RangeError are not recoverable at the
/// stream-boundary level and still abort the read.
fn is_skippable(err: &MSeedError) -> bool {
    matches!(
        err,
        MSeedError::TruncatedRecord(_)
            | MSeedError::InsufficientBytes(_, _)
            | MSeedError::UnsupportedVersion(_)
            | MSeedError::BadBlockette(_)
            | MSeedError::UnknownEncoding(_)
            | MSeedError::BadRecordIndicator(_, _)
            | MSeedError::FromUtf8Error(_)
            | MSeedError::DataLength(_, _, _, _)
            | MSeedError::CrcMismatch(_, _)
            | MSeedError::SteimIntegrityError(_, _)
            | MSeedError::SteimRangeError(_, _)
    )
}
