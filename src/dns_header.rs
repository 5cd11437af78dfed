use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::HeaderError;

/// Size of the fixed header on the wire.
pub const HEADER_LEN: usize = 12;

/// Standard query opcode.
pub const OPCODE_QUERY: u8 = 0;

/// What to do with the three reserved "Z" flag bits when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservedBits {
    /// Keep whatever the sender set and carry on.
    #[default]
    Ignore,
    /// Reject headers with any Z bit set.
    Reject,
}

/// DNS response codes (RFC 1035 / RFC 2136).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrset,
    NxRrset,
    NotAuth,
    NotZone,
    Unassigned(u8),
}

impl ResponseCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ResponseCode::NoError,
            1 => ResponseCode::FormErr,
            2 => ResponseCode::ServFail,
            3 => ResponseCode::NxDomain,
            4 => ResponseCode::NotImp,
            5 => ResponseCode::Refused,
            6 => ResponseCode::YxDomain,
            7 => ResponseCode::YxRrset,
            8 => ResponseCode::NxRrset,
            9 => ResponseCode::NotAuth,
            10 => ResponseCode::NotZone,
            other => ResponseCode::Unassigned(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            ResponseCode::NoError => 0,
            ResponseCode::FormErr => 1,
            ResponseCode::ServFail => 2,
            ResponseCode::NxDomain => 3,
            ResponseCode::NotImp => 4,
            ResponseCode::Refused => 5,
            ResponseCode::YxDomain => 6,
            ResponseCode::YxRrset => 7,
            ResponseCode::NxRrset => 8,
            ResponseCode::NotAuth => 9,
            ResponseCode::NotZone => 10,
            ResponseCode::Unassigned(value) => value,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::NoError => f.write_str("NOERROR"),
            ResponseCode::FormErr => f.write_str("FORMERR"),
            ResponseCode::ServFail => f.write_str("SERVFAIL"),
            ResponseCode::NxDomain => f.write_str("NXDOMAIN"),
            ResponseCode::NotImp => f.write_str("NOTIMP"),
            ResponseCode::Refused => f.write_str("REFUSED"),
            ResponseCode::YxDomain => f.write_str("YXDOMAIN"),
            ResponseCode::YxRrset => f.write_str("YXRRSET"),
            ResponseCode::NxRrset => f.write_str("NXRRSET"),
            ResponseCode::NotAuth => f.write_str("NOTAUTH"),
            ResponseCode::NotZone => f.write_str("NOTZONE"),
            ResponseCode::Unassigned(value) => write!(f, "RCODE{}", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsFlags {
    pub is_response: bool,           // QR: false = query, true = response
    pub opcode: u8,                  // Operation code (0 = standard query)
    pub authoritative: bool,         // AA
    pub truncated: bool,             // TC
    pub recursion_desired: bool,     // RD
    pub recursion_available: bool,   // RA
    pub z: u8,                       // Reserved (should be 0)
    pub response_code: ResponseCode, // RCODE
}

impl Default for DnsFlags {
    fn default() -> Self {
        DnsFlags {
            is_response: false,
            opcode: OPCODE_QUERY,
            authoritative: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            z: 0,
            response_code: ResponseCode::NoError,
        }
    }
}

impl DnsFlags {
    /// Fails if opcode or response code would not fit their 4-bit fields.
    pub fn validate(&self) -> Result<(), HeaderError> {
        if self.opcode > 0xF {
            return Err(HeaderError::OpcodeOutOfRange(self.opcode));
        }
        let rcode = self.response_code.to_u8();
        if rcode > 0xF {
            return Err(HeaderError::RcodeOutOfRange(rcode));
        }
        Ok(())
    }

    pub fn to_u16(&self) -> u16 {
        let mut flags: u16 = 0;

        if self.is_response { flags |= 1 << 15; }                  // QR at bit 15
        flags |= (self.opcode as u16 & 0xF) << 11;                 // OPCODE at bits 11-14
        if self.authoritative { flags |= 1 << 10; }                // AA at bit 10
        if self.truncated { flags |= 1 << 9; }                     // TC at bit 9
        if self.recursion_desired { flags |= 1 << 8; }             // RD at bit 8
        if self.recursion_available { flags |= 1 << 7; }           // RA at bit 7
        flags |= (self.z as u16 & 0x7) << 4;                       // Z at bits 4-6 (reserved)
        flags |= self.response_code.to_u8() as u16 & 0xF;          // RCODE at bits 0-3

        flags
    }

    pub fn from_u16(flags: u16) -> Self {
        DnsFlags {
            is_response: (flags & (1 << 15)) != 0,
            opcode: ((flags >> 11) & 0xF) as u8,
            authoritative: (flags & (1 << 10)) != 0,
            truncated: (flags & (1 << 9)) != 0,
            recursion_desired: (flags & (1 << 8)) != 0,
            recursion_available: (flags & (1 << 7)) != 0,
            z: ((flags >> 4) & 0x7) as u8,
            response_code: ResponseCode::from_u8((flags & 0xF) as u8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsHeader {
    pub id: u16,
    pub flags: DnsFlags,
    pub question_count: u16,
    pub answer_count: u16,
    pub authority_count: u16,
    pub additional_count: u16,
}

impl DnsHeader {
    pub fn from_bytes(bytes: &[u8], reserved: ReservedBits) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_LEN {
            return Err(HeaderError::Truncated(bytes.len()));
        }

        let mut buf = &bytes[..HEADER_LEN];
        let id = buf.get_u16();
        let flags = DnsFlags::from_u16(buf.get_u16());
        flags.validate()?;
        if reserved == ReservedBits::Reject && flags.z != 0 {
            return Err(HeaderError::ReservedBitsSet(flags.z));
        }

        Ok(DnsHeader {
            id,
            flags,
            question_count: buf.get_u16(),
            answer_count: buf.get_u16(),
            authority_count: buf.get_u16(),
            additional_count: buf.get_u16(),
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];

        let mut buf = &mut bytes[..];
        buf.put_u16(self.id);
        buf.put_u16(self.flags.to_u16());
        buf.put_u16(self.question_count);
        buf.put_u16(self.answer_count);
        buf.put_u16(self.authority_count);
        buf.put_u16(self.additional_count);

        bytes
    }
}
