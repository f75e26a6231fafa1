//! Read-only support for MiniSEED v2 records: fixed header, blockette
//! chain, and the raw encoded payload. See [`crate::v2_to_v3`] for
//! conversion into the v3 record model this library otherwise operates on.

pub mod blockette;
pub mod header;

use std::convert::TryFrom;
use std::io::prelude::*;

use crate::mseed_error::MSeedError;
use blockette::{Blockette, DataExtensionBlockette, DataOnlyBlockette, SampleRateBlockette};
use header::V2Header;

/// A decoded v2 record: fixed header, the blockette chain in on-record
/// order, and the raw (still encoded) payload bytes.
#[derive(Debug, Clone)]
pub struct V2Record {
    pub header: V2Header,
    pub blockettes: Vec<Blockette>,
    pub encoded_data: Vec<u8>,
}

impl V2Record {
    /// The effective record length in bytes: from blockette 1000's exponent
    /// when present, else the default SEED record length of 4096 bytes.
    fn record_length(&self, default_len: usize) -> usize {
        self.data_only_blockette()
            .map(|b| b.record_length() as usize)
            .unwrap_or(default_len)
    }

    pub fn data_only_blockette(&self) -> Option<DataOnlyBlockette> {
        // "last wins" when multiple B1000 occurrences are present.
        self.blockettes
            .iter()
            .rev()
            .find_map(|b| match b {
                Blockette::DataOnly(d) => Some(*d),
                _ => None,
            })
    }

    pub fn data_extension_blockette(&self) -> Option<DataExtensionBlockette> {
        self.blockettes.iter().rev().find_map(|b| match b {
            Blockette::DataExtension(d) => Some(*d),
            _ => None,
        })
    }

    pub fn sample_rate_blockette(&self) -> Option<SampleRateBlockette> {
        self.blockettes.iter().rev().find_map(|b| match b {
            Blockette::SampleRate(d) => Some(*d),
            _ => None,
        })
    }

    /// Effective sample rate in Hz: blockette 100 overrides the fixed
    /// header's factor/multiplier computation.
    pub fn effective_sample_rate(&self) -> f64 {
        match self.sample_rate_blockette() {
            Some(b) => b.actual_sample_rate as f64,
            None => self.header.computed_sample_rate(),
        }
    }

    /// Reads one v2 record from `buf_reader`. The record length is taken
    /// from blockette 1000 if present; otherwise the default SEED record
    /// length of 4096 bytes is assumed, matching common archive practice.
    /// The blockette chain is read first (it ends at `beginning_of_data`,
    /// always known from the fixed header), so the true record length can
    /// be learned from blockette 1000 before the payload read is sized —
    /// a record declaring a length other than 4096 (legal per the SEED
    /// record-length exponent) is read in full rather than truncated, and
    /// the stream stays aligned for whatever record follows.
    pub fn from_reader<R: BufRead>(buf_reader: &mut R) -> Result<V2Record, MSeedError> {
        const DEFAULT_RECORD_LEN: usize = 4096;

        let mut fixed = [0u8; header::FIXED_HEADER_SIZE];
        let n = buf_reader.by_ref().take(header::FIXED_HEADER_SIZE as u64).read(&mut fixed)?;
        if n < header::FIXED_HEADER_SIZE {
            return Err(MSeedError::TruncatedRecord(header::FIXED_HEADER_SIZE - n));
        }
        let head = V2Header::try_from(&fixed)?;

        let chain_end = (head.beginning_of_data as usize).max(header::FIXED_HEADER_SIZE);
        let mut full = Vec::with_capacity(chain_end);
        full.extend_from_slice(&fixed);
        full.extend_from_slice(&read_n(buf_reader, chain_end - header::FIXED_HEADER_SIZE)?);

        let mut blockettes = Vec::new();
        let mut offset = head.first_blockette_offset;
        for _ in 0..head.num_blockettes {
            if offset == 0 {
                break;
            }
            let (b, next) = blockette::parse_blockette(&full, offset)?;
            blockettes.push(b);
            offset = next;
        }

        let mut record = V2Record {
            header: head,
            blockettes,
            encoded_data: Vec::new(),
        };
        let record_len = record.record_length(DEFAULT_RECORD_LEN);
        if record_len < full.len() {
            return Err(MSeedError::BadBlockette(1000));
        }
        full.extend_from_slice(&read_n(buf_reader, record_len - full.len())?);

        let data_start = record.header.beginning_of_data as usize;
        record.encoded_data = full[data_start..record_len].to_vec();
        Ok(record)
    }
}

/// Reads exactly `n` more bytes from `buf_reader`, failing with
/// `TruncatedRecord` rather than silently returning a short buffer on EOF.
fn read_n<R: BufRead>(buf_reader: &mut R, n: usize) -> Result<Vec<u8>, MSeedError> {
    let mut out = Vec::with_capacity(n);
    let read = buf_reader.by_ref().take(n as u64).read_to_end(&mut out)?;
    if read < n {
        return Err(MSeedError::TruncatedRecord(n - read));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn sample_v2_record_bytes() -> Vec<u8> {
        let mut buf = vec![b' '; 4096];
        buf[0..6].copy_from_slice(b"000001");
        buf[6] = b'D';
        buf[8..13].copy_from_slice(b"TEST ");
        buf[13..15].copy_from_slice(b"00");
        buf[15..18].copy_from_slice(b"BHZ");
        buf[18..20].copy_from_slice(b"XX");
        buf[20..22].copy_from_slice(&2012u16.to_be_bytes());
        buf[22..24].copy_from_slice(&1u16.to_be_bytes());
        buf[24] = 0;
        buf[25] = 0;
        buf[26] = 0;
        buf[27] = 0;
        buf[28..30].copy_from_slice(&4680u16.to_be_bytes());
        buf[30..32].copy_from_slice(&4u16.to_be_bytes());
        buf[32..34].copy_from_slice(&40i16.to_be_bytes());
        buf[34..36].copy_from_slice(&1i16.to_be_bytes());
        buf[36] = 0;
        buf[37] = 0;
        buf[38] = 0;
        buf[39] = 2; // num blockettes
        buf[40..44].copy_from_slice(&0i32.to_be_bytes());
        buf[44..46].copy_from_slice(&64u16.to_be_bytes());
        buf[46..48].copy_from_slice(&48u16.to_be_bytes()); // first blockette offset

        // blockette 1000 at offset 48
        buf[48..50].copy_from_slice(&1000u16.to_be_bytes());
        buf[50..52].copy_from_slice(&56u16.to_be_bytes()); // next blockette offset
        buf[52] = 11; // steim2
        buf[53] = 1; // big-endian
        buf[54] = 12; // 4096 byte record
        buf[55] = 0;

        // blockette 1001 at offset 56
        buf[56..58].copy_from_slice(&1001u16.to_be_bytes());
        buf[58..60].copy_from_slice(&0u16.to_be_bytes()); // end of chain
        buf[60] = 80; // timing quality
        buf[61] = 250u8; // -6 as i8
        buf[62] = 0;
        buf[63] = 1; // frame count

        buf[64..68].copy_from_slice(&[1, 2, 3, 4]); // dummy payload bytes
        buf
    }

    #[test]
    fn parses_blockette_chain_and_payload() -> Result<(), MSeedError> {
        let bytes = sample_v2_record_bytes();
        let mut reader = BufReader::new(&bytes[..]);
        let rec = V2Record::from_reader(&mut reader)?;
        assert_eq!(rec.header.num_samples, 4);
        assert_eq!(rec.blockettes.len(), 2);
        let b1000 = rec.data_only_blockette().unwrap();
        assert_eq!(b1000.encoding, 11);
        assert!(b1000.word_order_big_endian);
        assert_eq!(b1000.record_length(), 4096);
        let b1001 = rec.data_extension_blockette().unwrap();
        assert_eq!(b1001.timing_quality, 80);
        assert_eq!(b1001.frame_count, 1);
        assert_eq!(&rec.encoded_data[0..4], &[1, 2, 3, 4]);
        Ok(())
    }

    /// Builds a single-blockette (B1000 only) v2 record of exactly
    /// `total_len` bytes, with `record_length_exponent` set to `exponent`
    /// and a 4-byte marker at the start of the payload.
    fn v2_record_bytes(exponent: u8, total_len: usize) -> Vec<u8> {
        let mut buf = vec![b' '; total_len];
        buf[0..6].copy_from_slice(b"000001");
        buf[6] = b'D';
        buf[8..13].copy_from_slice(b"TEST ");
        buf[13..15].copy_from_slice(b"00");
        buf[15..18].copy_from_slice(b"BHZ");
        buf[18..20].copy_from_slice(b"XX");
        buf[20..22].copy_from_slice(&2012u16.to_be_bytes());
        buf[22..24].copy_from_slice(&1u16.to_be_bytes());
        buf[24] = 0;
        buf[25] = 0;
        buf[26] = 0;
        buf[27] = 0;
        buf[28..30].copy_from_slice(&4680u16.to_be_bytes());
        buf[30..32].copy_from_slice(&4u16.to_be_bytes());
        buf[32..34].copy_from_slice(&40i16.to_be_bytes());
        buf[34..36].copy_from_slice(&1i16.to_be_bytes());
        buf[36] = 0;
        buf[37] = 0;
        buf[38] = 0;
        buf[39] = 1; // one blockette: B1000 only
        buf[40..44].copy_from_slice(&0i32.to_be_bytes());
        buf[44..46].copy_from_slice(&64u16.to_be_bytes()); // beginning_of_data
        buf[46..48].copy_from_slice(&48u16.to_be_bytes()); // first blockette offset

        buf[48..50].copy_from_slice(&1000u16.to_be_bytes());
        buf[50..52].copy_from_slice(&0u16.to_be_bytes()); // end of chain
        buf[52] = 11; // steim2
        buf[53] = 1; // big-endian
        buf[54] = exponent;
        buf[55] = 0;

        buf[64..68].copy_from_slice(&[9, 9, 9, 9]); // payload marker
        buf
    }

    #[test]
    fn honors_record_length_exponent_above_4096_without_desync() -> Result<(), MSeedError> {
        let record_len = 1usize << 13; // exponent 13 -> 8192 bytes, a legal SEED config
        let mut first = v2_record_bytes(13, record_len);
        first[record_len - 1] = 0xAA; // tail marker, would be lost if truncated to 4096

        let mut second = v2_record_bytes(12, 4096);
        second[0..6].copy_from_slice(b"000002");

        let mut stream = first;
        stream.extend_from_slice(&second);

        let mut reader = BufReader::new(&stream[..]);
        let first_rec = V2Record::from_reader(&mut reader)?;
        assert_eq!(first_rec.data_only_blockette().unwrap().record_length(), 8192);
        assert_eq!(&first_rec.encoded_data[0..4], &[9, 9, 9, 9]);

        // Reading the next record proves the stream wasn't desynced by a
        // fixed 4096-byte advance on the oversized first record.
        let second_rec = V2Record::from_reader(&mut reader)?;
        assert_eq!(second_rec.header.sequence_number, "000002");
        assert_eq!(&second_rec.encoded_data[0..4], &[9, 9, 9, 9]);
        Ok(())
    }

    #[test]
    fn last_b1000_wins_when_duplicated() -> Result<(), MSeedError> {
        let mut bytes = sample_v2_record_bytes();
        bytes[39] = 3; // three blockettes now
        // second blockette 1000 at offset 64, encoding 10 this time
        bytes[50..52].copy_from_slice(&64u16.to_be_bytes()); // b1000 #1 next -> offset 64
        bytes[64..66].copy_from_slice(&1000u16.to_be_bytes());
        bytes[66..68].copy_from_slice(&56u16.to_be_bytes()); // next -> b1001 at 56
        bytes[68] = 10; // steim1
        bytes[69] = 0; // little-endian
        bytes[70] = 12;
        bytes[71] = 0;
        let mut reader = BufReader::new(&bytes[..]);
        let rec = V2Record::from_reader(&mut reader)?;
        let b1000 = rec.data_only_blockette().unwrap();
        assert_eq!(b1000.encoding, 10);
        assert!(!b1000.word_order_big_endian);
        Ok(())
    }
}
