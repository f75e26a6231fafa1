//! Merges a time-ordered stream of v3 records sharing a source id into
//! fewer, larger records. See spec.md §4.7.

use chrono::{DateTime, Utc};

use crate::data_encoding::DataEncoding;
use crate::encoded_timeseries::EncodedTimeseries;
use crate::extra_headers::ExtraHeaders;
use crate::header::MSeed3Header;
use crate::mseed_error::MSeedError;
use crate::record::MSeed3Record;
use crate::seed_time::{sample_period_seconds, sample_start_time};
use crate::{steim1, steim2};

/// Tunable knobs for [`merge`].
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// Decompress Steim-encoded inputs to allow merging across them;
    /// without this, adjacent Steim records are left unmerged.
    pub decompress: bool,
    /// Maximum size, in bytes, of a single output record's payload.
    pub max_record_bytes: u32,
    /// Fraction of the sample period used as the contiguity tolerance.
    pub time_tolerance_factor: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            decompress: false,
            max_record_bytes: 4096,
            time_tolerance_factor: 0.5,
        }
    }
}

/// Merges `records` (assumed already time-ordered) into fewer records,
/// per the contiguity rules in spec.md §4.7. Records that cannot be merged
/// (different source id/rate, encoding mismatch without `decompress`, or a
/// gap/overlap beyond tolerance) start a new output group.
pub fn merge(records: Vec<MSeed3Record>, options: &MergeOptions) -> Result<Vec<MSeed3Record>, MSeedError> {
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let mut groups: Vec<Vec<MSeed3Record>> = Vec::new();
    let mut iter = records.into_iter();
    let mut current_group = vec![iter.next().unwrap()];
    for rec in iter {
        let mergeable = {
            let prev = current_group.last().unwrap();
            is_mergeable(prev, &rec, options)
        };
        if mergeable {
            current_group.push(rec);
        } else {
            let prev_id = current_group.last().unwrap().identifier.to_string();
            log::debug!("merge group for {} closed: gap, overlap, or incompatible record", prev_id);
            groups.push(std::mem::take(&mut current_group));
            current_group = vec![rec];
        }
    }
    groups.push(current_group);

    let mut out = Vec::new();
    for group in groups {
        out.extend(merge_group(group, options)?);
    }
    Ok(out)
}

fn is_mergeable(prev: &MSeed3Record, next: &MSeed3Record, options: &MergeOptions) -> bool {
    if prev.identifier.to_string() != next.identifier.to_string() {
        return false;
    }
    let prev_rate = prev.header.get_sample_rate_hertz();
    let next_rate = next.header.get_sample_rate_hertz();
    if (prev_rate - next_rate).abs() > 1e-9 {
        return false;
    }
    if prev.header.encoding.value() != next.header.encoding.value() && !options.decompress {
        return false;
    }
    let period = sample_period_seconds(prev.header.sample_rate_period);
    let predicted = sample_start_time(
        prev.header.get_start_as_utc(),
        prev.header.sample_rate_period,
        prev.header.num_samples as u64,
    );
    let actual = next.header.get_start_as_utc();
    let tolerance_seconds = options.time_tolerance_factor * period;
    let diff_seconds = (actual - predicted).num_nanoseconds().unwrap_or(i64::MAX) as f64 / 1.0e9;
    diff_seconds.abs() <= tolerance_seconds
}

fn merge_group(mut group: Vec<MSeed3Record>, options: &MergeOptions) -> Result<Vec<MSeed3Record>, MSeedError> {
    if group.len() < 2 {
        return Ok(group);
    }
    let encoding = group[0].header.encoding;
    if encoding.is_steim() && !options.decompress {
        return Ok(group);
    }
    match encoding {
        DataEncoding::INT16 | DataEncoding::INT32 | DataEncoding::STEIM1 | DataEncoding::STEIM2 => {
            let mut samples: Vec<i32> = Vec::new();
            for rec in &mut group {
                rec.decode_samples()?;
                match &rec.encoded_data {
                    EncodedTimeseries::Int16(v) => samples.extend(v.iter().map(|&x| x as i32)),
                    EncodedTimeseries::Int32(v) => samples.extend(v.iter().copied()),
                    other => {
                        return Err(MSeedError::Unknown(format!(
                            "unexpected decoded sample type during merge: {:?}",
                            other
                        )))
                    }
                }
            }
            build_integer_records(&group[0], samples, encoding, options)
        }
        // Float/text/opaque merging isn't sample-concatenation-safe the same
        // way; leave the group unmerged rather than guess at semantics.
        _ => Ok(group),
    }
}

fn build_integer_records(
    template: &MSeed3Record,
    samples: Vec<i32>,
    encoding: DataEncoding,
    options: &MergeOptions,
) -> Result<Vec<MSeed3Record>, MSeedError> {
    let mut out = Vec::new();
    let mut start: DateTime<Utc> = template.header.get_start_as_utc();
    let rate = template.header.sample_rate_period;

    if encoding.is_steim() {
        let mut remaining = &samples[..];
        while !remaining.is_empty() {
            let (encoded_data, consumed) =
                encode_steim_chunk(remaining, encoding, options.max_record_bytes as usize)?;
            let mut header = MSeed3Header::new(start, encoding, rate, consumed);
            header.publication_version = template.header.publication_version;
            out.push(MSeed3Record::new(
                header,
                template.identifier.clone(),
                ExtraHeaders::new(),
                encoded_data,
            ));
            start = sample_start_time(start, rate, consumed as u64);
            remaining = &remaining[consumed..];
        }
        return Ok(out);
    }

    let max_samples_per_record = match encoding {
        DataEncoding::INT16 => (options.max_record_bytes as usize / 2).max(1),
        DataEncoding::INT32 => (options.max_record_bytes as usize / 4).max(1),
        _ => samples.len().max(1),
    };
    for chunk in samples.chunks(max_samples_per_record) {
        let encoded_data = match encoding {
            DataEncoding::INT16 => EncodedTimeseries::Int16(chunk.iter().map(|&x| x as i16).collect()),
            DataEncoding::INT32 => EncodedTimeseries::Int32(chunk.to_vec()),
            _ => unreachable!(),
        };
        let mut header = MSeed3Header::new(start, encoding, rate, chunk.len());
        header.publication_version = template.header.publication_version;
        let rec = MSeed3Record::new(
            header,
            template.identifier.clone(),
            ExtraHeaders::new(),
            encoded_data,
        );
        start = sample_start_time(start, rate, chunk.len() as u64);
        out.push(rec);
    }
    Ok(out)
}

/// Encodes a prefix of `samples` as Steim-1/2, shrinking the prefix until
/// the actual encoded size (per
/// [`crate::steim_frame_block::SteimFrameBlock::encoded_byte_len`]) fits
/// `max_bytes`, rather than guessing a samples-per-record budget up front
/// from an assumed compression ratio. Returns the encoded payload and how
/// many samples it consumed.
fn encode_steim_chunk(
    samples: &[i32],
    encoding: DataEncoding,
    max_bytes: usize,
) -> Result<(EncodedTimeseries, usize), MSeedError> {
    let mut take = samples.len();
    loop {
        let chunk = &samples[..take];
        let block = match encoding {
            DataEncoding::STEIM1 => steim1::encode(chunk, 0)?,
            DataEncoding::STEIM2 => steim2::encode(chunk, 0)?,
            _ => unreachable!("encode_steim_chunk called with non-Steim encoding"),
        };
        if block.encoded_byte_len() <= max_bytes || take == 1 {
            let bytes = block.get_encoded_data()?;
            let encoded = match encoding {
                DataEncoding::STEIM1 => EncodedTimeseries::Steim1(bytes),
                DataEncoding::STEIM2 => EncodedTimeseries::Steim2(bytes),
                _ => unreachable!(),
            };
            return Ok((encoded, take));
        }
        take = (take / 2).max(1);
    }
}
