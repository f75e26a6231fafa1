use crate::MSeedError;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt;

lazy_static! {
    static ref PARSE_FDSN_REGEX: Regex = Regex::new(
        r"(?x)^
            FDSN:                      # prefix
            (?P<net>[-A-Z0-9]{1,8})_   # network, 1-8 chars
            (?P<sta>[-A-Z0-9]{1,8})_   # station, 1-8 chars
            (?P<loc>[-A-Z0-9]{0,8})_   # location, 0-8 chars, may be empty
            (?P<band>[A-Z0-9])_        # band, exactly 1 char
            (?P<source>[A-Z0-9])_      # source, exactly 1 char
            (?P<subsource>[A-Z0-9]?)$  # subsource, 0 or 1 char
"
    )
    .unwrap();
}

pub const PREFIX: &str = "FDSN:";

/// Band code table (FDSN source identifier spec, Table B), in the order
/// `bandCodeForRate` evaluates them. `short_period` is `true` for bands whose
/// range is gated on a response period below 10s; bands without a response
/// period split (M, L, V, U, R, P, T, Q) are rate-only.
struct BandRow {
    code: char,
    lo: f64,
    hi: f64,
    short_period: bool,
    description: &'static str,
}

const BAND_TABLE: &[BandRow] = &[
    BandRow { code: 'G', lo: 1000.0, hi: 5000.0, short_period: true, description: "≥1000 to <5000 sps, response period <10s" },
    BandRow { code: 'F', lo: 1000.0, hi: 5000.0, short_period: false, description: "≥1000 to <5000 sps, response period ≥10s" },
    BandRow { code: 'D', lo: 250.0, hi: 1000.0, short_period: true, description: "≥250 to <1000 sps, response period <10s" },
    BandRow { code: 'C', lo: 250.0, hi: 1000.0, short_period: false, description: "≥250 to <1000 sps, response period ≥10s" },
    BandRow { code: 'E', lo: 80.0, hi: 250.0, short_period: true, description: "≥80 to <250 sps, response period <10s" },
    BandRow { code: 'H', lo: 80.0, hi: 250.0, short_period: false, description: "≥80 to <250 sps, response period ≥10s" },
    BandRow { code: 'S', lo: 10.0, hi: 80.0, short_period: true, description: "≥10 to <80 sps, response period <10s" },
    BandRow { code: 'B', lo: 10.0, hi: 80.0, short_period: false, description: "≥10 to <80 sps, response period ≥10s" },
    BandRow { code: 'M', lo: 1.05, hi: 10.0, short_period: false, description: ">1 to <10 sps" },
    BandRow { code: 'L', lo: 0.95, hi: 1.05, short_period: false, description: "≈1 sps" },
    BandRow { code: 'V', lo: 0.095, hi: 0.105, short_period: false, description: "≈0.1 sps" },
    BandRow { code: 'U', lo: 0.0095, hi: 0.0105, short_period: false, description: "≈0.01 sps" },
    BandRow { code: 'R', lo: 0.0001, hi: 0.001, short_period: false, description: "≥0.0001 to <0.001 sps" },
    BandRow { code: 'P', lo: 0.00001, hi: 0.0001, short_period: false, description: "≥0.00001 to <0.0001 sps" },
    BandRow { code: 'T', lo: 0.000001, hi: 0.00001, short_period: false, description: "≥0.000001 to <0.00001 sps" },
    BandRow { code: 'Q', lo: 0.0, hi: 0.000001, short_period: false, description: "<0.000001 sps" },
];

/// Abridged table of FDSN instrument/source codes (second letter of a
/// channel code). Not exhaustive; covers the codes that appear in common
/// archives.
const SOURCE_TABLE: &[(char, &str)] = &[
    ('H', "High gain seismometer"),
    ('L', "Low gain seismometer"),
    ('G', "Gravimeter"),
    ('M', "Mass position seismometer"),
    ('N', "Accelerometer"),
    ('P', "Geophone, short period"),
    ('D', "Pressure"),
    ('A', "Tilt meter"),
    ('T', "Temperature"),
    ('W', "Wind speed"),
];

/// Resolve the FDSN band code for a nominal sample rate in samples/second
/// (spec.md Table B). When `response_period_s` is `None`, the broadband
/// (non short-period) branch is preferred for bands that depend on it, per
/// spec's deterministic tie-break rule.
pub fn band_code_for_rate(rate_sps: f64, response_period_s: Option<f64>) -> Result<char, MSeedError> {
    let rate = rate_sps.abs();
    let short_period = response_period_s.map(|p| p < 10.0);
    let mut broadband_candidate: Option<char> = None;
    let mut short_period_candidate: Option<char> = None;
    for row in BAND_TABLE {
        if rate >= row.lo && rate < row.hi {
            match short_period {
                Some(true) if row.short_period => return Ok(row.code),
                Some(false) if !row.short_period => return Ok(row.code),
                None => {
                    if row.short_period {
                        short_period_candidate = Some(row.code);
                    } else {
                        broadband_candidate = Some(row.code);
                    }
                }
                _ => {}
            }
        }
    }
    // Unknown response period: prefer the broadband row, fall back to the
    // short-period row if that's the only match (e.g. bands with no
    // broadband counterpart).
    broadband_candidate
        .or(short_period_candidate)
        .ok_or(MSeedError::UnknownBandCode('?'))
}

/// Human-readable description of a band code, from the table bundled with
/// this library.
pub fn describe_band(c: char) -> Result<&'static str, MSeedError> {
    BAND_TABLE
        .iter()
        .find(|row| row.code == c)
        .map(|row| row.description)
        .ok_or(MSeedError::UnknownBandCode(c))
}

/// Human-readable description of a source (instrument) code.
pub fn describe_source(c: char) -> Result<&'static str, MSeedError> {
    SOURCE_TABLE
        .iter()
        .find(|(code, _)| *code == c)
        .map(|(_, desc)| *desc)
        .ok_or(MSeedError::UnknownSourceCode(c))
}

#[derive(Debug, Clone)]
pub enum SourceIdentifier {
    Raw(String),
    Fdsn(SourceId),
}
impl SourceIdentifier {
    pub fn calc_len(&self) -> u8 {
        match self {
            SourceIdentifier::Raw(s) => s.len() as u8,
            SourceIdentifier::Fdsn(f) => f.calc_len(),
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            SourceIdentifier::Raw(s) => Vec::from(s.as_bytes()),
            SourceIdentifier::Fdsn(f) => f.as_bytes(),
        }
    }
}

impl From<String> for SourceIdentifier {
    fn from(s: String) -> Self {
        let sid = SourceId::parse(&s);
        match sid {
            Ok(fdsn) => SourceIdentifier::Fdsn(fdsn),
            Err(_) => SourceIdentifier::Raw(s),
        }
    }
}

impl From<&str> for SourceIdentifier {
    fn from(s: &str) -> Self {
        let sid = SourceId::parse(s);
        match sid {
            Ok(fdsn) => SourceIdentifier::Fdsn(fdsn),
            Err(_) => SourceIdentifier::Raw(s.to_string()),
        }
    }
}
impl TryFrom<Vec<u8>> for SourceIdentifier {
    type Error = MSeedError;

    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        let s = String::from_utf8(v)?;
        Ok(SourceIdentifier::from(&*s))
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SourceIdentifier::Raw(s) => write!(f, "{}", s),
            SourceIdentifier::Fdsn(fdsn) => write!(f, "{}", fdsn),
        }
    }
}

impl Serialize for SourceIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SourceIdentifier::Raw(s) => serializer.serialize_str(s),
            SourceIdentifier::Fdsn(fdsn) => serializer.serialize_str(&fdsn.to_string()),
        }
    }
}

/// An FDSN source identifier string parsed into its component parts: see
/// <https://docs.fdsn.org/projects/source-identifiers/en/v1.0/index.html>.
/// Canonical form is `FDSN:NET_STA_LOC_BAND_SOURCE_SUBSOURCE`; an empty
/// location renders as an empty field between its surrounding underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub band: String,
    pub source: String,
    pub subsource: String,
}

impl SourceId {
    const MAX_NET: usize = 8;
    const MAX_STA: usize = 8;
    const MAX_LOC: usize = 8;

    /// Calculates the length when turned back into a string. This includes
    /// 5 bytes for the FDSN: prefix and the 5 underscore separators.
    pub fn calc_len(&self) -> u8 {
        (10 + self.network.len()
            + self.station.len()
            + self.location.len()
            + self.band.len()
            + self.source.len()
            + self.subsource.len()) as u8
    }
    /// Returns a byte slice of this identifier.
    pub fn as_bytes(&self) -> Vec<u8> {
        Vec::from(self.to_string().as_bytes())
    }

    /// Parses identifier from Vec of bytes
    pub fn from_utf8(vec: Vec<u8>) -> Result<SourceId, MSeedError> {
        let text = String::from_utf8(vec)?;
        SourceId::parse(&text)
    }

    pub fn parse(id: &str) -> Result<SourceId, MSeedError> {
        let captures = PARSE_FDSN_REGEX
            .captures(id)
            .ok_or_else(|| MSeedError::MalformedIdentifier(id.to_string(), String::from("does not match FDSN:NET_STA_LOC_BAND_SOURCE_SUBSOURCE")))?;
        let sid = SourceId {
            network: capture_named(&captures, "net", id)?,
            station: capture_named(&captures, "sta", id)?,
            location: capture_named(&captures, "loc", id)?,
            band: capture_named(&captures, "band", id)?,
            source: capture_named(&captures, "source", id)?,
            subsource: capture_named(&captures, "subsource", id)?,
        };
        sid.validate_lengths(id)?;
        Ok(sid)
    }

    fn validate_lengths(&self, id: &str) -> Result<(), MSeedError> {
        if self.network.len() > Self::MAX_NET
            || self.station.len() > Self::MAX_STA
            || self.location.len() > Self::MAX_LOC
        {
            return Err(MSeedError::MalformedIdentifier(
                id.to_string(),
                String::from("network, station or location field too long"),
            ));
        }
        Ok(())
    }

    /// Constructs a new identifier from its parts, without parsing.
    pub fn new(
        network: &str,
        station: &str,
        location: &str,
        band: &str,
        source: &str,
        subsource: &str,
    ) -> Result<SourceId, MSeedError> {
        let sid = SourceId {
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            band: band.to_string(),
            source: source.to_string(),
            subsource: subsource.to_string(),
        };
        sid.validate_lengths(&sid.to_string())?;
        Ok(sid)
    }

    /// A sentinel identifier for data whose network/station/location are not
    /// known, with the band derived from the nominal sample rate.
    pub fn create_unknown(rate_sps: f64) -> SourceId {
        let band = band_code_for_rate(rate_sps, None).unwrap_or('L');
        SourceId {
            network: String::from("XX"),
            station: String::from("UNKN"),
            location: String::new(),
            band: band.to_string(),
            source: String::from("H"),
            subsource: String::from("U"),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}{}_{}_{}_{}_{}_{}",
            PREFIX,
            self.network,
            self.station,
            self.location,
            self.band,
            self.source,
            self.subsource
        )
    }
}

fn capture_named(captures: &Captures, name: &str, id: &str) -> Result<String, MSeedError> {
    match captures.name(name) {
        Some(s) => Ok(s.as_str().to_string()),
        None => Err(MSeedError::IdentifierParse(
            id.to_string(),
            name.to_string(),
        )),
    }
}

struct SourceIdentifierVisitor;

impl<'de> Visitor<'de> for SourceIdentifierVisitor {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a source identifier string")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(String::from(value))
    }
}
impl<'de> Deserialize<'de> for SourceIdentifier {
    fn deserialize<D>(deserializer: D) -> Result<SourceIdentifier, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(SourceIdentifier::from(
            deserializer.deserialize_str(SourceIdentifierVisitor)?,
        ))
    }
}
