//! The 64-byte Steim frame (one nibble-control word plus 15 data words) that
//! both Steim-1 ([`crate::steim1`]) and Steim-2 ([`crate::steim2`]) pack
//! their differences into; only the per-word bit layout differs between the
//! two schemes, so the frame container itself is shared.

use crate::MSeedError;

use std::io::prelude::*;

/// One 64-byte Steim frame: a nibble-control word (2 bits per data word,
/// packed high-to-low) plus 15 32-bit data words.
#[derive(Debug)]
pub struct SteimFrame {
    nibbles: u32,
    pub(crate) words: [u32; 15],
}

impl SteimFrame {
    pub fn new() -> SteimFrame {
        SteimFrame {
            nibbles: 0,
            words: [0; 15],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nibbles == 0
    }

    /// Sets data word `idx` (0..15) and its 2-bit nibble tag.
    pub fn set_word(&mut self, word: u32, nibble: u32, idx: usize) {
        assert!(idx < 16, "word idx must be 0..16, got {}", idx);
        self.words[idx] = word;
        self.nibbles += nibble << (30 - 2 * idx as u32);
    }
}

impl Default for SteimFrame {
    fn default() -> Self {
        SteimFrame::new()
    }
}

/// A sequence of Steim frames for one encoded payload, plus the sample
/// count and Steim version (1 or 2) they were packed under.
#[derive(Debug)]
pub struct SteimFrameBlock {
    pub num_samples: usize,
    pub steim_version: usize,
    pub steim_frame: Vec<SteimFrame>,
}

impl SteimFrameBlock {
    pub fn new(steim_version: usize) -> SteimFrameBlock {
        SteimFrameBlock {
            steim_version,
            num_samples: 0,
            steim_frame: Vec::new(),
        }
    }

    /// Serializes the frame block to its big-endian on-wire byte form: each
    /// frame as its nibble word followed by 15 data words.
    pub fn get_encoded_data(&self) -> Result<Vec<u8>, MSeedError> {
        let mut encoded_data = Vec::with_capacity(self.encoded_byte_len());
        for f in &self.steim_frame {
            encoded_data.write_all(&f.nibbles.to_be_bytes())?;
            for w in f.words {
                encoded_data.write_all(&w.to_be_bytes())?;
            }
        }
        Ok(encoded_data)
    }

    /// Byte length the encoded form will have, without encoding it; lets
    /// the merger check a candidate chunk against a record's byte budget
    /// before committing to it (see
    /// [`crate::merge::build_integer_records`]).
    pub fn encoded_byte_len(&self) -> usize {
        self.steim_frame.len() * 64
    }

    /// Overwrites X(N), the reverse integration constant, in the first
    /// frame. Called once encoding finishes, since the true final sample
    /// isn't known until all frames are packed.
    pub fn reverse_integration_constant(&mut self, v: i32) {
        assert_ne!(self.steim_frame.len(), 0);
        self.steim_frame[0].set_word(u32::from_be_bytes(v.to_be_bytes()), 0, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_integration_constant_patches_word_one() -> Result<(), MSeedError> {
        let mut frame_block = SteimFrameBlock::new(1);
        frame_block.steim_frame.push(SteimFrame::new());
        frame_block.reverse_integration_constant(1);
        let enc_data = frame_block.get_encoded_data()?;
        assert_eq!(&enc_data[8..12], &[0, 0, 0, 1]);
        Ok(())
    }

    #[test]
    fn encoded_byte_len_matches_actual_output() -> Result<(), MSeedError> {
        let mut frame_block = SteimFrameBlock::new(2);
        frame_block.steim_frame.push(SteimFrame::new());
        frame_block.steim_frame.push(SteimFrame::new());
        assert_eq!(frame_block.encoded_byte_len(), 128);
        assert_eq!(frame_block.get_encoded_data()?.len(), 128);
        Ok(())
    }
}
