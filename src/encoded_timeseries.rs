use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Serialize, Deserialize};
use std::fmt;
use std::fmt::Formatter;
use std::io::prelude::*;
use std::io::BufWriter;

use crate::data_encoding::DataEncoding;
use crate::mseed_error::MSeedError;
use crate::primitive_codec::{self, ByteOrder};
use crate::{steim1, steim2};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum EncodedTimeseries {
    Raw(Vec<u8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Steim1(Vec<u8>),
    Steim2(Vec<u8>),
    Steim3(Vec<u8>),
    /// `TEXT` (encoding 0): a UTF-8-validated string, distinct from
    /// `Opaque` since its bytes carry meaning (see [`Self::code_points`]
    /// and [`Self::as_text`]).
    Text(String),
    Opaque(Vec<u8>),
}

impl EncodedTimeseries {
    /// The UTF-8 code points of a `Text` payload, as integers. `None` for
    /// every other encoding.
    pub fn code_points(&self) -> Option<Vec<u32>> {
        match self {
            EncodedTimeseries::Text(s) => Some(s.chars().map(|c| c as u32).collect()),
            _ => None,
        }
    }

    /// The raw string of a `Text` payload. `None` for every other encoding.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EncodedTimeseries::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl EncodedTimeseries {
    pub fn write_to<W>(&self, buf: &mut BufWriter<W>) -> Result<(), MSeedError>
    where
        W: std::io::Write,
    {
        match self {
            EncodedTimeseries::Raw(v) => {
                buf.write_all(v)?;
                Ok(())
            }
            EncodedTimeseries::Int16(v) => {
                for &el in v {
                    buf.write_i16::<LittleEndian>(el)?;
                }
                Ok(())
            }
            EncodedTimeseries::Int32(v) => {
                for &el in v {
                    buf.write_i32::<LittleEndian>(el)?;
                }
                Ok(())
            }
            EncodedTimeseries::Float32(v) => {
                for &el in v {
                    buf.write_f32::<LittleEndian>(el)?;
                }
                Ok(())
            }
            EncodedTimeseries::Float64(v) => {
                for &el in v {
                    buf.write_f64::<LittleEndian>(el)?;
                }
                Ok(())
            }
            EncodedTimeseries::Steim1(v) => {
                buf.write_all(v)?;
                Ok(())
            }
            EncodedTimeseries::Steim2(v) => {
                buf.write_all(v)?;
                Ok(())
            }
            EncodedTimeseries::Steim3(v) => {
                buf.write_all(v)?;
                Ok(())
            }
            EncodedTimeseries::Text(s) => {
                buf.write_all(s.as_bytes())?;
                Ok(())
            }
            EncodedTimeseries::Opaque(v) => {
                buf.write_all(v)?;
                Ok(())
            }
        }
    }

    pub fn byte_len(&self) -> u32 {
        match self {
            EncodedTimeseries::Raw(v) => v.len() as u32,
            EncodedTimeseries::Int16(v) => 2 * v.len() as u32,
            EncodedTimeseries::Int32(v) => 4 * v.len() as u32,
            EncodedTimeseries::Float32(v) => 4 * v.len() as u32,
            EncodedTimeseries::Float64(v) => 8 * v.len() as u32,
            EncodedTimeseries::Steim1(v) => v.len() as u32,
            EncodedTimeseries::Steim2(v) => v.len() as u32,
            EncodedTimeseries::Steim3(v) => v.len() as u32,
            EncodedTimeseries::Text(s) => s.len() as u32,
            EncodedTimeseries::Opaque(v) => v.len() as u32,
        }
    }
    /// Reconciles the number of samples in the header with the size of the EncodedTimeseries.
    /// For the primitive types, Int16, Int32, Float32 and Float64 the value is calculated from
    /// the length of the array. For the remaining, the passed in header num_samples is
    /// return as it is assumed to be correct.
    pub fn reconcile_num_samples(&self, header_num_sample: u32) -> u32 {
        match self {
            EncodedTimeseries::Int16(v) => v.len() as u32,
            EncodedTimeseries::Int32(v) => v.len() as u32,
            EncodedTimeseries::Float32(v) => v.len() as u32,
            EncodedTimeseries::Float64(v) => v.len() as u32,
            EncodedTimeseries::Raw(_) => header_num_sample,
            EncodedTimeseries::Steim1(_) => header_num_sample,
            EncodedTimeseries::Steim2(_) => header_num_sample,
            EncodedTimeseries::Steim3(_) => header_num_sample,
            EncodedTimeseries::Text(_) => header_num_sample,
            EncodedTimeseries::Opaque(_) => header_num_sample,
        }
    }
}

impl EncodedTimeseries {
    /// Decodes a raw on-wire payload per its header-declared encoding. V3
    /// primitive payloads are always little-endian. Steim-3 is recognized
    /// but always refused, per the authoritative encoding table.
    pub fn decode(bytes: &[u8], encoding: DataEncoding, num_samples: u32) -> Result<EncodedTimeseries, MSeedError> {
        match encoding {
            DataEncoding::INT16 => Ok(EncodedTimeseries::Int16(primitive_codec::decode_int16(bytes, ByteOrder::Little)?)),
            DataEncoding::INT32 => Ok(EncodedTimeseries::Int32(primitive_codec::decode_int32(bytes, ByteOrder::Little)?)),
            DataEncoding::FLOAT32 => Ok(EncodedTimeseries::Float32(primitive_codec::decode_float32(bytes, ByteOrder::Little)?)),
            DataEncoding::FLOAT64 => Ok(EncodedTimeseries::Float64(primitive_codec::decode_float64(bytes, ByteOrder::Little)?)),
            DataEncoding::STEIM1 => Ok(EncodedTimeseries::Int32(steim1::decode(bytes, num_samples)?)),
            DataEncoding::STEIM2 => Ok(EncodedTimeseries::Int32(steim2::decode(bytes, num_samples)?)),
            DataEncoding::STEIM3 => Err(MSeedError::UnknownEncoding(encoding.value())),
            DataEncoding::TEXT => Ok(EncodedTimeseries::Text(String::from_utf8(bytes.to_vec())?)),
            DataEncoding::OPAQUE => Ok(EncodedTimeseries::Opaque(bytes.to_vec())),
            DataEncoding::UNKNOWN(val) => Err(MSeedError::UnknownEncoding(val)),
        }
    }
}

impl fmt::Display for EncodedTimeseries {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EncodedTimeseries::Raw(v) => {
                write!(f, "Raw bytes, {} bytes", v.len())
            }
            EncodedTimeseries::Int16(v) => {
                write!(f, "Int16, {} samples", v.len())
            }
            EncodedTimeseries::Int32(v) => {
                write!(f, "Int32, {} samples", v.len())
            }
            EncodedTimeseries::Float32(v) => {
                write!(f, "Float32, {} samples", v.len())
            }
            EncodedTimeseries::Float64(v) => {
                write!(f, "Float64, {} samples", v.len())
            }
            EncodedTimeseries::Steim1(v) => {
                write!(f, "Steim1, {} bytes", v.len())
            }
            EncodedTimeseries::Steim2(v) => {
                write!(f, "Steim2, {} bytes", v.len())
            }
            EncodedTimeseries::Steim3(v) => {
                write!(f, "Steim3, {} bytes", v.len())
            }
            EncodedTimeseries::Text(s) => {
                write!(f, "Text, {} bytes ({} code points)", s.len(), s.chars().count())
            }
            EncodedTimeseries::Opaque(v) => {
                write!(f, "Opaque, {} bytes", v.len())
            }
        }
    }
}
