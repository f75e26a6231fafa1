//! Encode/decode the fixed-width primitive sample encodings (INT16, INT32,
//! FLOAT32, FLOAT64) and the TEXT payload, honoring a record's byte order.
//!
//! MiniSEED v3 primitive payloads are always little-endian. MiniSEED v2
//! payloads carry byte order in blockette 1000; this module is shared by
//! both so v2 can decode either order and v2->v3 conversion can byte-swap
//! into the v3-mandated little-endian form.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

use crate::mseed_error::MSeedError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

pub fn decode_int16(bytes: &[u8], order: ByteOrder) -> Result<Vec<i16>, MSeedError> {
    let mut cursor = Cursor::new(bytes);
    let n = bytes.len() / 2;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(match order {
            ByteOrder::Little => cursor.read_i16::<LittleEndian>()?,
            ByteOrder::Big => cursor.read_i16::<BigEndian>()?,
        });
    }
    Ok(out)
}

pub fn encode_int16(samples: &[i16], order: ByteOrder) -> Result<Vec<u8>, MSeedError> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        match order {
            ByteOrder::Little => out.write_i16::<LittleEndian>(s)?,
            ByteOrder::Big => out.write_i16::<BigEndian>(s)?,
        }
    }
    Ok(out)
}

pub fn decode_int32(bytes: &[u8], order: ByteOrder) -> Result<Vec<i32>, MSeedError> {
    let mut cursor = Cursor::new(bytes);
    let n = bytes.len() / 4;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(match order {
            ByteOrder::Little => cursor.read_i32::<LittleEndian>()?,
            ByteOrder::Big => cursor.read_i32::<BigEndian>()?,
        });
    }
    Ok(out)
}

pub fn encode_int32(samples: &[i32], order: ByteOrder) -> Result<Vec<u8>, MSeedError> {
    let mut out = Vec::with_capacity(samples.len() * 4);
    for &s in samples {
        match order {
            ByteOrder::Little => out.write_i32::<LittleEndian>(s)?,
            ByteOrder::Big => out.write_i32::<BigEndian>(s)?,
        }
    }
    Ok(out)
}

pub fn decode_float32(bytes: &[u8], order: ByteOrder) -> Result<Vec<f32>, MSeedError> {
    let mut cursor = Cursor::new(bytes);
    let n = bytes.len() / 4;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(match order {
            ByteOrder::Little => cursor.read_f32::<LittleEndian>()?,
            ByteOrder::Big => cursor.read_f32::<BigEndian>()?,
        });
    }
    Ok(out)
}

pub fn encode_float32(samples: &[f32], order: ByteOrder) -> Result<Vec<u8>, MSeedError> {
    let mut out = Vec::with_capacity(samples.len() * 4);
    for &s in samples {
        match order {
            ByteOrder::Little => out.write_f32::<LittleEndian>(s)?,
            ByteOrder::Big => out.write_f32::<BigEndian>(s)?,
        }
    }
    Ok(out)
}

pub fn decode_float64(bytes: &[u8], order: ByteOrder) -> Result<Vec<f64>, MSeedError> {
    let mut cursor = Cursor::new(bytes);
    let n = bytes.len() / 8;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(match order {
            ByteOrder::Little => cursor.read_f64::<LittleEndian>()?,
            ByteOrder::Big => cursor.read_f64::<BigEndian>()?,
        });
    }
    Ok(out)
}

pub fn encode_float64(samples: &[f64], order: ByteOrder) -> Result<Vec<u8>, MSeedError> {
    let mut out = Vec::with_capacity(samples.len() * 8);
    for &s in samples {
        match order {
            ByteOrder::Little => out.write_f64::<LittleEndian>(s)?,
            ByteOrder::Big => out.write_f64::<BigEndian>(s)?,
        }
    }
    Ok(out)
}

/// Byte-swaps a primitive-encoded payload in place, given its element width
/// in bytes (2, 4 or 8). Used when converting v2 big-endian payloads to the
/// v3 little-endian convention. Swapping twice is the identity (P4).
pub fn swap_byte_order(bytes: &[u8], element_width: usize) -> Vec<u8> {
    if element_width <= 1 {
        return bytes.to_vec();
    }
    let mut out = Vec::with_capacity(bytes.len());
    for chunk in bytes.chunks(element_width) {
        out.extend(chunk.iter().rev());
    }
    out
}
