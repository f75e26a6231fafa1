use chrono::ParseError;
use std::string::FromUtf8Error;
use thiserror::Error;

/// Errors produced while decoding, encoding or transforming MiniSEED records.
///
/// Variants are grouped loosely along the taxonomy used by the format:
/// structural (`BadRecordIndicator`, `UnsupportedVersion`, `TruncatedRecord`,
/// `BadBlockette`, `UnknownEncoding`), integrity (`CrcMismatch`, the Steim
/// checks), semantic (identifier/path errors) and range errors. `NotFound`
/// from an extra-header `get` is returned as `Ok(None)` by callers, not as
/// this error; it only appears here for `delete` of an absent path.
#[derive(Error, Debug)]
pub enum MSeedError {
    #[error("IO Error")]
    IOError(#[from] std::io::Error),
    #[error("Insufficient bytes, {0} < fixed header size {1}")]
    InsufficientBytes(usize, usize),
    #[error("truncated record: expected {0} more bytes but stream ended")]
    TruncatedRecord(usize),
    #[error("CRC mismatch for record: calc:{0:#X} header:{1:#X}")]
    CrcMismatch(u32, u32),
    #[error("Text not UTF8")]
    FromUtf8Error(#[from] FromUtf8Error),
    #[error("cannot parse extra headers")]
    JsonError(#[from] serde_json::Error),
    #[error("MSeed header must start with MS, (77, 83)  but was `{0}{1}`")]
    BadRecordIndicator(u8, u8),
    #[error("MSeed3 header format_version must be 3 but was `{0}`")]
    UnsupportedVersion(u8),
    #[error("cannot parse {1} in FDSN source identifier `{0}`")]
    IdentifierParse(String, String),
    #[error("malformed source identifier `{0}`: {1}")]
    MalformedIdentifier(String, String),
    #[error("unknown band code `{0}`")]
    UnknownBandCode(char),
    #[error("unknown source code `{0}`")]
    UnknownSourceCode(char),
    #[error("extra headers must be a JSON object but was `{0}`")]
    ExtraHeaderNotObject(serde_json::Value),
    #[error("extra header path `{0}` conflicts with a non-object node")]
    PathConflict(String),
    #[error("extra header path `{0}` not found")]
    NotFound(String),
    #[error("MSeed3 extra header parse: `{0}`")]
    ExtraHeaderParse(String),
    #[error("Unknown data encoding: `{0}`")]
    UnknownEncoding(u8),
    #[error("Expected {0} bytes for {1} samples as encoding type {2} but header has data_length={3} bytes.")]
    DataLength(u32, u32, u8, u32),
    #[error("Date parsing error: `{0}`")]
    ParseError(#[from] ParseError),
    #[error("time field out of range: {0}")]
    RangeError(String),
    #[error("unknown or unsupported blockette type {0}")]
    BadBlockette(u16),
    #[error("MSeed3 compression/decompression error: `{0}`")]
    Compression(String),
    #[error("Steim decode integrity check failed: decoded final sample {0} != expected {1}")]
    SteimIntegrityError(i32, i32),
    #[error("Steim difference {0} exceeds the {1}-bit range for this encoding")]
    SteimRangeError(i64, u8),
    #[error("MSeed3 error: `{0}`")]
    Unknown(String),
}
