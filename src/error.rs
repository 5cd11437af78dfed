use std::time::Duration;

use thiserror::Error;

/// Failures while encoding or decoding a domain name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("buffer truncated inside domain name at offset {0}")]
    Truncated(usize),

    #[error("compression pointer at offset {0} is truncated")]
    TruncatedPointer(usize),

    #[error("compression pointer at offset {at} does not point backwards (target {target})")]
    ForwardPointer { at: usize, target: usize },

    #[error("compression pointer at offset {at} targets {target}, outside the packet")]
    PointerOutOfBounds { at: usize, target: usize },

    #[error("compression pointer target {0} visited twice")]
    PointerLoop(usize),

    #[error("reserved label type {0:#04x}")]
    ReservedLabelType(u8),

    #[error("label at offset {0} runs past the end of the packet")]
    LabelOverrun(usize),

    #[error("label is not valid UTF-8")]
    InvalidUtf8,

    #[error("name has more than {0} labels")]
    TooManyLabels(usize),

    #[error("empty label in {0:?}")]
    EmptyLabel(String),

    #[error("label {0:?} is longer than 63 bytes")]
    LabelTooLong(String),

    #[error("label {0:?} contains '@'")]
    InvalidCharacter(String),

    #[error("encoded name {0:?} exceeds 255 bytes")]
    NameTooLong(String),
}

/// Failures in the fixed 12-byte header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("buffer too small for DNS header: {0} bytes")]
    Truncated(usize),

    #[error("opcode {0} does not fit in 4 bits")]
    OpcodeOutOfRange(u8),

    #[error("response code {0} does not fit in 4 bits")]
    RcodeOutOfRange(u8),

    #[error("reserved Z bits set: {0:#03b}")]
    ReservedBitsSet(u8),
}

/// Failures in questions, resource records and their RDATA.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error("buffer too small for {0}")]
    Truncated(&'static str),

    #[error("{rtype} RDATA must be {expected} bytes, got {actual}")]
    BadLength {
        rtype: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("RDATA length {declared} does not match the {consumed} bytes consumed")]
    RdataLengthMismatch { declared: usize, consumed: usize },

    #[error("RDATA is longer than 65535 bytes")]
    RdataTooLong,

    #[error("invalid IP address {0:?}")]
    InvalidAddress(String),

    #[error("{field} value {value:?} is out of range")]
    OutOfRange { field: &'static str, value: String },

    #[error("{0} record needs a {1}")]
    MissingField(&'static str, &'static str),

    #[error("malformed SOA data: {0}")]
    MalformedSoa(String),

    #[error("malformed TXT data: {0}")]
    MalformedTxt(String),

    #[error("malformed CAA data: {0}")]
    MalformedCaa(String),

    #[error("invalid hex RDATA {0:?}")]
    InvalidHex(String),
}

/// Structural and protocol-invariant failures of a whole message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("{section} count is {declared} but {actual} entries were supplied")]
    CountMismatch {
        section: &'static str,
        declared: u16,
        actual: usize,
    },

    #[error("{0} section holds more than 65535 entries")]
    TooManyEntries(&'static str),

    #[error("{0} trailing bytes after the last section")]
    TrailingBytes(usize),

    #[error("authoritative {0} response carries no SOA in the authority section")]
    MissingSoa(&'static str),
}

/// Failures building a zone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ZoneError {
    #[error("zone {0} has no SOA record")]
    MissingSoa(String),

    #[error("zone {0} has more than one SOA record")]
    MultipleSoa(String),

    #[error("SOA is owned by {owner}, not the zone apex {apex}")]
    SoaNotAtApex { owner: String, apex: String },

    #[error("record {record} is outside zone {zone}")]
    OutOfZone { record: String, zone: String },
}

/// Failures loading a zone file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read zone file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid zone file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("record {index} ({name}): {message}")]
    InvalidRecord {
        index: usize,
        name: String,
        message: String,
    },

    #[error("record {index} ({name}): {source}")]
    InvalidRdata {
        index: usize,
        name: String,
        #[source]
        source: RecordError,
    },

    #[error(transparent)]
    Zone(#[from] ZoneError),
}

/// Failures talking to an upstream server.
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("upstream socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("no matching response from {upstream} within {timeout:?}")]
    Timeout { upstream: String, timeout: Duration },
}
