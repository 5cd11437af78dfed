use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use bytes::{Buf, BufMut, BytesMut};

use crate::dns_name::{encode_domain_name, normalize_name, parse_domain_name};
use crate::dns_rdata::{decode_rdata, encode_rdata};
use crate::error::RecordError;

/// DNS Question Section
/// Format: QNAME + QTYPE (2 bytes) + QCLASS (2 bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub name: String,        // Domain name, lower-cased (e.g., "example.com")
    pub qtype: RecordType,   // Query type (A, AAAA, CNAME, etc.)
    pub qclass: RecordClass, // Query class (usually IN for Internet)
}

/// DNS Resource Record
/// Format: NAME + TYPE (2 bytes) + CLASS (2 bytes) + TTL (4 bytes) + RDLENGTH (2 bytes) + RDATA
///
/// RDATA is kept in its textual form; MX and SRV carry their numeric fields
/// separately and keep only the target name in `rdata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,        // Owner name
    pub rtype: RecordType,   // Record type
    pub rclass: RecordClass, // Record class
    pub ttl: u32,            // Time to live in seconds
    pub rdata: String,       // Resource data, textual form
    pub priority: Option<u16>,
    pub weight: Option<u16>,
    pub port: Option<u16>,
}

/// DNS record types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,     // IPv4 address
    NS,    // Name server
    MD,    // Mail destination (obsolete)
    MF,    // Mail forwarder (obsolete)
    CNAME, // Canonical name
    SOA,   // Start of authority
    MB,    // Mailbox domain name
    MG,    // Mail group member
    MR,    // Mail rename domain name
    NULL,  // Null record
    WKS,   // Well known service
    PTR,   // Pointer record
    HINFO, // Host information
    MINFO, // Mailbox information
    MX,    // Mail exchange
    TXT,   // Text record
    AAAA,  // IPv6 address
    SRV,   // Service locator
    CAA,   // Certification authority authorization
    Unknown(u16),
}

impl RecordType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordType::A,
            2 => RecordType::NS,
            3 => RecordType::MD,
            4 => RecordType::MF,
            5 => RecordType::CNAME,
            6 => RecordType::SOA,
            7 => RecordType::MB,
            8 => RecordType::MG,
            9 => RecordType::MR,
            10 => RecordType::NULL,
            11 => RecordType::WKS,
            12 => RecordType::PTR,
            13 => RecordType::HINFO,
            14 => RecordType::MINFO,
            15 => RecordType::MX,
            16 => RecordType::TXT,
            28 => RecordType::AAAA,
            33 => RecordType::SRV,
            257 => RecordType::CAA,
            other => RecordType::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::MD => 3,
            RecordType::MF => 4,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::MB => 7,
            RecordType::MG => 8,
            RecordType::MR => 9,
            RecordType::NULL => 10,
            RecordType::WKS => 11,
            RecordType::PTR => 12,
            RecordType::HINFO => 13,
            RecordType::MINFO => 14,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::CAA => 257,
            RecordType::Unknown(value) => value,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::NS => "NS",
            RecordType::MD => "MD",
            RecordType::MF => "MF",
            RecordType::CNAME => "CNAME",
            RecordType::SOA => "SOA",
            RecordType::MB => "MB",
            RecordType::MG => "MG",
            RecordType::MR => "MR",
            RecordType::NULL => "NULL",
            RecordType::WKS => "WKS",
            RecordType::PTR => "PTR",
            RecordType::HINFO => "HINFO",
            RecordType::MINFO => "MINFO",
            RecordType::MX => "MX",
            RecordType::TXT => "TXT",
            RecordType::AAAA => "AAAA",
            RecordType::SRV => "SRV",
            RecordType::CAA => "CAA",
            RecordType::Unknown(_) => "TYPE",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Unknown(value) => write!(f, "TYPE{}", value),
            known => f.write_str(known.as_str()),
        }
    }
}

impl FromStr for RecordType {
    type Err = String;

    /// Accepts mnemonics ("MX", case-insensitive) and the generic "TYPE65" form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        if let Some(code) = upper.strip_prefix("TYPE") {
            return code
                .parse::<u16>()
                .map(RecordType::from_u16)
                .map_err(|_| format!("invalid record type: {}", s));
        }
        (1..=257u16)
            .map(RecordType::from_u16)
            .find(|t| !matches!(t, RecordType::Unknown(_)) && t.as_str() == upper)
            .ok_or_else(|| format!("invalid record type: {}", s))
    }
}

/// DNS classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordClass {
    IN, // Internet
    CS, // CSNET (obsolete)
    CH, // CHAOS
    HS, // Hesiod
    Unknown(u16),
}

impl RecordClass {
    pub fn from_u16(value: u16) -> Self {
        match value {
            1 => RecordClass::IN,
            2 => RecordClass::CS,
            3 => RecordClass::CH,
            4 => RecordClass::HS,
            other => RecordClass::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            RecordClass::IN => 1,
            RecordClass::CS => 2,
            RecordClass::CH => 3,
            RecordClass::HS => 4,
            RecordClass::Unknown(value) => value,
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordClass::IN => f.write_str("IN"),
            RecordClass::CS => f.write_str("CS"),
            RecordClass::CH => f.write_str("CH"),
            RecordClass::HS => f.write_str("HS"),
            RecordClass::Unknown(value) => write!(f, "CLASS{}", value),
        }
    }
}

impl FromStr for RecordClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(RecordClass::IN),
            "CS" => Ok(RecordClass::CS),
            "CH" => Ok(RecordClass::CH),
            "HS" => Ok(RecordClass::HS),
            other => other
                .strip_prefix("CLASS")
                .and_then(|code| code.parse::<u16>().ok())
                .map(RecordClass::from_u16)
                .ok_or_else(|| format!("invalid record class: {}", s)),
        }
    }
}

impl DnsQuestion {
    /// Builds a question; the name is normalized to lower case.
    pub fn new(name: &str, qtype: RecordType, qclass: RecordClass) -> Self {
        DnsQuestion {
            name: normalize_name(name),
            qtype,
            qclass,
        }
    }

    /// Parse a DNS question from bytes starting at the given offset
    /// Returns the question and the new offset after parsing
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<(Self, usize), RecordError> {
        let (name, new_offset) = parse_domain_name(bytes, offset)?;

        if new_offset + 4 > bytes.len() {
            return Err(RecordError::Truncated("question type and class"));
        }

        let mut fixed = &bytes[new_offset..new_offset + 4];
        let qtype = RecordType::from_u16(fixed.get_u16());
        let qclass = RecordClass::from_u16(fixed.get_u16());

        Ok((DnsQuestion::new(&name, qtype, qclass), new_offset + 4))
    }

    /// Convert the question to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let mut bytes = BytesMut::new();

        bytes.put_slice(&encode_domain_name(&self.name)?);
        bytes.put_u16(self.qtype.to_u16());
        bytes.put_u16(self.qclass.to_u16());

        Ok(bytes.to_vec())
    }
}

impl fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qclass, self.qtype)
    }
}

impl DnsRecord {
    /// Create a record with the given parameters and no MX/SRV fields
    pub fn new(name: &str, rtype: RecordType, rclass: RecordClass, ttl: u32, rdata: &str) -> Self {
        DnsRecord {
            name: name.to_string(),
            rtype,
            rclass,
            ttl,
            rdata: rdata.to_string(),
            priority: None,
            weight: None,
            port: None,
        }
    }

    /// Create an A record (IPv4 address)
    pub fn new_a_record(name: &str, ttl: u32, ip: Ipv4Addr) -> Self {
        Self::new(name, RecordType::A, RecordClass::IN, ttl, &ip.to_string())
    }

    /// Create an AAAA record (IPv6 address)
    pub fn new_aaaa_record(name: &str, ttl: u32, ip: Ipv6Addr) -> Self {
        Self::new(name, RecordType::AAAA, RecordClass::IN, ttl, &ip.to_string())
    }

    /// Create an MX record
    pub fn new_mx_record(name: &str, ttl: u32, priority: u16, exchange: &str) -> Self {
        DnsRecord {
            priority: Some(priority),
            ..Self::new(name, RecordType::MX, RecordClass::IN, ttl, exchange)
        }
    }

    /// Create an SRV record
    pub fn new_srv_record(
        name: &str,
        ttl: u32,
        priority: u16,
        weight: u16,
        port: u16,
        target: &str,
    ) -> Self {
        DnsRecord {
            priority: Some(priority),
            weight: Some(weight),
            port: Some(port),
            ..Self::new(name, RecordType::SRV, RecordClass::IN, ttl, target)
        }
    }

    /// Returns a copy of this record owned by `name`.
    pub fn with_name(&self, name: &str) -> Self {
        DnsRecord {
            name: name.to_string(),
            ..self.clone()
        }
    }

    /// Parse a resource record from bytes starting at the given offset
    /// Returns the record and the new offset after parsing
    pub fn from_bytes(bytes: &[u8], offset: usize) -> Result<(Self, usize), RecordError> {
        let (name, new_offset) = parse_domain_name(bytes, offset)?;

        if new_offset + 10 > bytes.len() {
            return Err(RecordError::Truncated("record fields"));
        }

        let mut fixed = &bytes[new_offset..new_offset + 10];
        let rtype = RecordType::from_u16(fixed.get_u16());
        let rclass = RecordClass::from_u16(fixed.get_u16());
        let ttl = fixed.get_u32();
        let rdlength = fixed.get_u16() as usize;

        let data_offset = new_offset + 10;
        if data_offset + rdlength > bytes.len() {
            return Err(RecordError::Truncated("RDATA"));
        }

        let rdata = decode_rdata(rtype, bytes, data_offset, rdlength)?;

        Ok((
            DnsRecord {
                name,
                rtype,
                rclass,
                ttl,
                rdata: rdata.text,
                priority: rdata.priority,
                weight: rdata.weight,
                port: rdata.port,
            },
            data_offset + rdlength,
        ))
    }

    /// Convert the record to bytes, with the owner and any RDATA names
    /// written uncompressed
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        let rdata = encode_rdata(self)?;
        let rdlength = u16::try_from(rdata.len()).map_err(|_| RecordError::RdataTooLong)?;

        let mut bytes = BytesMut::new();
        bytes.put_slice(&encode_domain_name(&self.name)?);
        bytes.put_u16(self.rtype.to_u16());
        bytes.put_u16(self.rclass.to_u16());
        bytes.put_u32(self.ttl);
        bytes.put_u16(rdlength);
        bytes.put_slice(&rdata);

        Ok(bytes.to_vec())
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.name, self.ttl, self.rclass, self.rtype)?;
        for field in [self.priority, self.weight, self.port].into_iter().flatten() {
            write!(f, " {}", field)?;
        }
        write!(f, " {}", self.rdata)
    }
}
