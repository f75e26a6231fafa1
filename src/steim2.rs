use crate::mseed_error::MSeedError;
use crate::steim_frame_block::{SteimFrame, SteimFrameBlock};
use std::collections::VecDeque;
use std::convert::TryFrom;

/// Decode the indicated number of samples from a Steim-2 compressed byte
/// array. See [`crate::steim1::decode`] for the sibling Steim-1 routine;
/// the frame layout (16 32-bit words, word 0 a nibble-control word, frame 0
/// carrying X(0)/X(n) in words 1 and 2) is identical between the two
/// schemes. Only the per-word bit packing differs.
pub fn decode(b: &[u8], num_samples: u32) -> Result<Vec<i32>, MSeedError> {
    if b.len() % 64 != 0 {
        return Err(MSeedError::Compression(format!(
            "encoded data length is not multiple of 64 bytes ({})",
            b.len()
        )));
    }
    let nsamp = num_samples as usize;
    let num_frames = b.len() / 64;
    let mut samples = Vec::with_capacity(nsamp);
    let mut start = 0;
    let mut end = 0;
    let mut last_value = 0;

    for i in 0..num_frames {
        let temp_samples = extract_samples(b, i * 64)?;
        let mut ts_itr = temp_samples.iter();
        if i == 0 {
            start = *ts_itr.next().ok_or_else(|| {
                MSeedError::Compression(String::from("steim2 frame 0 missing X(0)"))
            })?;
            samples.push(start);
            last_value = start;
            end = *ts_itr.next().ok_or_else(|| {
                MSeedError::Compression(String::from("steim2 frame 0 missing X(n)"))
            })?;
        }
        for d in ts_itr {
            last_value += d;
            samples.push(last_value);
        }
    }
    if samples.len() != nsamp {
        return Err(MSeedError::Compression(format!(
            "Number of samples decompressed doesn't match number in header: decomp: {} != {}, header",
            samples.len(),
            num_samples
        )));
    }
    if !samples.is_empty() && (samples[0] != start || *samples.last().unwrap() != end) {
        return Err(MSeedError::SteimIntegrityError(*samples.last().unwrap(), end));
    }
    Ok(samples)
}

/// Encode `samples` as Steim-2. `frames`, if non-zero, bounds the number of
/// 64-byte frames produced; remaining samples are simply not encoded once
/// the limit is reached (mirrors [`crate::steim1::encode`]'s behavior).
pub fn encode(samples: &[i32], frames: usize) -> Result<SteimFrameBlock, MSeedError> {
    if samples.is_empty() {
        return Err(MSeedError::Compression(String::from(
            "samples array is zero size",
        )));
    }
    // The first sample is stored raw as X(0), not diff-encoded, so it is
    // exempt from the 30-bit difference limit that applies from here on.
    let mut prev: i64 = samples[0] as i64;
    for &x in &samples[1..] {
        let d = x as i64 - prev;
        if !(-(1i64 << 29)..(1i64 << 29)).contains(&d) {
            return Err(MSeedError::SteimRangeError(d, 30));
        }
        prev = x as i64;
    }

    let mut frame_block = SteimFrameBlock::new(2);
    let diff_iter = samples.iter().scan(0i32, |state, &x| {
        let d = x - *state;
        *state = x;
        Some(d)
    });
    let mut grouper = Grouper::new(diff_iter).peekable();
    let mut num_samples = 0;
    let mut first_sample = true;

    while grouper.peek().is_some() {
        if frames != 0 && frame_block.steim_frame.len() >= frames {
            break;
        }
        let mut frame = SteimFrame::new();
        let mut frame_idx = 0;
        while frame_idx < 15 {
            let chunk = match grouper.next() {
                Some(c) => c,
                None => break,
            };
            if first_sample {
                match chunk {
                    Steim2Word::One(v) => frame.set_word(u32::from_be_bytes(v.to_be_bytes()), 0, 0),
                    other => {
                        return Err(MSeedError::Unknown(format!(
                            "first sample must decode as a single 32-bit value, got {:?}",
                            other
                        )))
                    }
                }
                first_sample = false;
                frame_idx += 2; // skip past the reserved X(n) slot
            } else {
                frame_idx = chunk.add_to_frame(&mut frame, frame_idx);
            }
            num_samples += chunk.num_samples();
        }
        frame_block.steim_frame.push(frame);
    }
    frame_block.num_samples = num_samples;
    if frame_block.steim_frame.is_empty() {
        return Err(MSeedError::Compression(String::from(
            "steim2 encode produced no frames",
        )));
    }
    frame_block.reverse_integration_constant(samples[num_samples - 1]);
    Ok(frame_block)
}

fn sign_extend(value: u32, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value << shift) as i32) >> shift
}

fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Extracts the group of `count` signed values, each `width` bits, packed
/// right-aligned (low-bit-first filled) within `word`'s low 30 bits.
fn unpack_group(word: u32, count: usize, width: u32) -> Vec<i32> {
    let remainder = word & mask(30);
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let shift = width * (count as u32 - 1 - i as u32);
        let v = (remainder >> shift) & mask(width);
        out.push(sign_extend(v, width));
    }
    out
}

fn extract_samples(bytes: &[u8], offset: usize) -> Result<Vec<i32>, MSeedError> {
    let nibbles_bytes = <[u8; 4]>::try_from(&bytes[offset..offset + 4]).unwrap();
    let nibbles = u32::from_be_bytes(nibbles_bytes);
    let mut temp = Vec::new();
    for i in 1..16 {
        let curr_nibble = (nibbles >> (32 - i * 2)) & 0x03;
        let offset_idx = offset + 4 * i;
        let word_bytes = <[u8; 4]>::try_from(&bytes[offset_idx..offset_idx + 4]).unwrap();
        let word = u32::from_be_bytes(word_bytes);
        match curr_nibble {
            0 => {
                if offset == 0 && (i == 1 || i == 2) {
                    temp.push(i32::from_be_bytes(word_bytes));
                }
            }
            1 => {
                for n in 0..4 {
                    temp.push((bytes[offset_idx + n] as i8) as i32);
                }
            }
            2 => {
                let dnib = (word >> 30) & 0x03;
                match dnib {
                    1 => temp.extend(unpack_group(word, 1, 30)),
                    2 => temp.extend(unpack_group(word, 2, 15)),
                    3 => temp.extend(unpack_group(word, 3, 10)),
                    _ => {
                        return Err(MSeedError::Compression(format!(
                            "invalid steim2 dnib {} for nibble 10",
                            dnib
                        )))
                    }
                }
            }
            3 => {
                let dnib = (word >> 30) & 0x03;
                match dnib {
                    0 => temp.extend(unpack_group(word, 5, 6)),
                    1 => temp.extend(unpack_group(word, 6, 5)),
                    2 => temp.extend(unpack_group(word, 7, 4)),
                    3 => {
                        return Err(MSeedError::Compression(String::from(
                            "reserved steim2 dnib 11 encountered",
                        )))
                    }
                    _ => unreachable!(),
                }
            }
            _ => unreachable!("2-bit nibble value out of range"),
        }
    }
    Ok(temp)
}

#[derive(Debug, Clone)]
enum Steim2Word {
    Seven([i32; 7]),
    Six([i32; 6]),
    Five([i32; 5]),
    Four([i32; 4]),
    Three([i32; 3]),
    Two([i32; 2]),
    One(i32),
}

fn pack_bits(vals: &[i32], width: u32) -> u32 {
    let mut w = 0u32;
    for &v in vals {
        w = (w << width) | ((v as u32) & mask(width));
    }
    w
}

impl Steim2Word {
    fn add_to_frame(&self, frame: &mut SteimFrame, frame_idx: usize) -> usize {
        let (word, nibble) = match self {
            Steim2Word::Seven(vals) => ((0b10u32 << 30) | pack_bits(vals, 4), 3u32),
            Steim2Word::Six(vals) => ((0b01u32 << 30) | pack_bits(vals, 5), 3u32),
            Steim2Word::Five(vals) => ((0b00u32 << 30) | pack_bits(vals, 6), 3u32),
            Steim2Word::Four(vals) => (pack_bits(vals, 8), 1u32),
            Steim2Word::Three(vals) => ((0b11u32 << 30) | pack_bits(vals, 10), 2u32),
            Steim2Word::Two(vals) => ((0b10u32 << 30) | pack_bits(vals, 15), 2u32),
            Steim2Word::One(v) => ((0b01u32 << 30) | pack_bits(&[*v], 30), 2u32),
        };
        frame.set_word(word, nibble, frame_idx);
        frame_idx + 1
    }

    fn num_samples(&self) -> usize {
        match self {
            Steim2Word::Seven(_) => 7,
            Steim2Word::Six(_) => 6,
            Steim2Word::Five(_) => 5,
            Steim2Word::Four(_) => 4,
            Steim2Word::Three(_) => 3,
            Steim2Word::Two(_) => 2,
            Steim2Word::One(_) => 1,
        }
    }
}

fn fits(v: i32, bits: u32) -> bool {
    let lo = -(1i64 << (bits - 1));
    let hi = (1i64 << (bits - 1)) - 1;
    let v = v as i64;
    v >= lo && v <= hi
}

/// Greedily groups a stream of differences into the widest Steim-2 word
/// that fits the next run: 7x4-bit, else 6x5, 5x6, 4x8, 3x10, 2x15, 1x30.
/// The very first value produced is always emitted as a single raw 32-bit
/// word (the X(0) constant), matching Steim-1's convention.
struct Grouper<I: Iterator<Item = i32>> {
    diffs: I,
    pending: VecDeque<i32>,
    first: bool,
}

impl<I: Iterator<Item = i32>> Grouper<I> {
    fn new(diffs: I) -> Self {
        Grouper {
            diffs,
            pending: VecDeque::new(),
            first: true,
        }
    }

    fn fill_to(&mut self, n: usize) {
        while self.pending.len() < n {
            match self.diffs.next() {
                Some(v) => self.pending.push_back(v),
                None => break,
            }
        }
    }
}

impl<I: Iterator<Item = i32>> Iterator for Grouper<I> {
    type Item = Steim2Word;

    fn next(&mut self) -> Option<Self::Item> {
        if self.first {
            self.first = false;
            return Some(Steim2Word::One(self.diffs.next()?));
        }
        self.fill_to(7);
        if self.pending.is_empty() {
            return None;
        }
        let take = |pending: &mut VecDeque<i32>, n: usize| -> Vec<i32> {
            (0..n).map(|_| pending.pop_front().unwrap()).collect()
        };
        if self.pending.len() >= 7 && self.pending.iter().take(7).all(|&v| fits(v, 4)) {
            let v = take(&mut self.pending, 7);
            return Some(Steim2Word::Seven([v[0], v[1], v[2], v[3], v[4], v[5], v[6]]));
        }
        if self.pending.len() >= 6 && self.pending.iter().take(6).all(|&v| fits(v, 5)) {
            let v = take(&mut self.pending, 6);
            return Some(Steim2Word::Six([v[0], v[1], v[2], v[3], v[4], v[5]]));
        }
        if self.pending.len() >= 5 && self.pending.iter().take(5).all(|&v| fits(v, 6)) {
            let v = take(&mut self.pending, 5);
            return Some(Steim2Word::Five([v[0], v[1], v[2], v[3], v[4]]));
        }
        if self.pending.len() >= 4 && self.pending.iter().take(4).all(|&v| fits(v, 8)) {
            let v = take(&mut self.pending, 4);
            return Some(Steim2Word::Four([v[0], v[1], v[2], v[3]]));
        }
        if self.pending.len() >= 3 && self.pending.iter().take(3).all(|&v| fits(v, 10)) {
            let v = take(&mut self.pending, 3);
            return Some(Steim2Word::Three([v[0], v[1], v[2]]));
        }
        if self.pending.len() >= 2 && self.pending.iter().take(2).all(|&v| fits(v, 15)) {
            let v = take(&mut self.pending, 2);
            return Some(Steim2Word::Two([v[0], v[1]]));
        }
        // single 30-bit value; range was validated by the caller up front
        let v = self.pending.pop_front().unwrap();
        Some(Steim2Word::One(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_mixed_magnitudes() -> Result<(), MSeedError> {
        let data = [0, 1, 2, 3, 100, 100, 100, -50, -60, 1_000_000, 1_000_001];
        let frame_block = encode(&data, 0)?;
        assert_eq!(frame_block.num_samples, data.len());
        let enc_bytes = frame_block.get_encoded_data()?;
        assert_eq!(
            i32::from_be_bytes(frame_block.steim_frame[0].words[0].to_be_bytes()),
            data[0]
        );
        let decoded = decode(&enc_bytes, frame_block.num_samples as u32)?;
        assert_eq!(decoded, data);
        Ok(())
    }

    #[test]
    fn frame0_word_values_match_x0_xn() -> Result<(), MSeedError> {
        let data = [0, 1, 2, 3, 100, 100, 100, -50, -60, 1_000_000, 1_000_001];
        let frame_block = encode(&data, 0)?;
        let enc_bytes = frame_block.get_encoded_data()?;
        let extracted = extract_samples(&enc_bytes, 0)?;
        assert_eq!(extracted[0], 0);
        assert_eq!(extracted[1], 1_000_001);
        Ok(())
    }

    #[test]
    fn range_error_on_overflow() {
        let err = encode(&[0, 1 << 30], 0).unwrap_err();
        assert!(matches!(err, MSeedError::SteimRangeError(_, 30)));
    }

    #[test]
    fn single_sample_round_trips() -> Result<(), MSeedError> {
        let data = [42];
        let frame_block = encode(&data, 0)?;
        let enc_bytes = frame_block.get_encoded_data()?;
        let decoded = decode(&enc_bytes, 1)?;
        assert_eq!(decoded, data);
        Ok(())
    }

    #[test]
    fn packs_seven_small_diffs_into_one_word() -> Result<(), MSeedError> {
        let mut data = vec![0];
        for i in 0..7 {
            data.push(data[i] + 1);
        }
        let frame_block = encode(&data, 0)?;
        // X0 + one 7x4 word = 2 words used, well under a full frame.
        assert_eq!(frame_block.steim_frame.len(), 1);
        let decoded = decode(&frame_block.get_encoded_data()?, frame_block.num_samples as u32)?;
        assert_eq!(decoded, data);
        Ok(())
    }
}
