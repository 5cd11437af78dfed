use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{Buf, BufMut, BytesMut};

use crate::dns_name::{encode_domain_name, parse_domain_name};
use crate::dns_question_and_answer::{DnsRecord, RecordType};
use crate::error::RecordError;

/// Longest TXT character-string.
const MAX_TXT_CHUNK: usize = 255;

/// Decoded RDATA: the textual form plus the numeric fields MX and SRV keep
/// outside of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RData {
    pub text: String,
    pub priority: Option<u16>,
    pub weight: Option<u16>,
    pub port: Option<u16>,
}

impl RData {
    fn text(text: String) -> Self {
        RData {
            text,
            ..RData::default()
        }
    }
}

/// Interprets `length` bytes of RDATA starting at `start`.
///
/// `packet` is the whole message so that compressed names inside RDATA can
/// be followed; the caller has already checked `start + length` is in bounds.
pub fn decode_rdata(
    rtype: RecordType,
    packet: &[u8],
    start: usize,
    length: usize,
) -> Result<RData, RecordError> {
    let end = start + length;
    let raw = &packet[start..end];

    match rtype {
        RecordType::A => {
            let octets: [u8; 4] = raw.try_into().map_err(|_| RecordError::BadLength {
                rtype: "A",
                expected: 4,
                actual: length,
            })?;
            Ok(RData::text(Ipv4Addr::from(octets).to_string()))
        }
        RecordType::AAAA => {
            let octets: [u8; 16] = raw.try_into().map_err(|_| RecordError::BadLength {
                rtype: "AAAA",
                expected: 16,
                actual: length,
            })?;
            Ok(RData::text(Ipv6Addr::from(octets).to_string()))
        }
        RecordType::CNAME | RecordType::NS | RecordType::PTR => {
            let name = read_name(packet, start, end)?;
            Ok(RData::text(name))
        }
        RecordType::MX => {
            if length < 2 {
                return Err(RecordError::Truncated("MX RDATA"));
            }
            let priority = u16::from_be_bytes([raw[0], raw[1]]);
            let exchange = read_name(packet, start + 2, end)?;
            Ok(RData {
                text: exchange,
                priority: Some(priority),
                ..RData::default()
            })
        }
        RecordType::SRV => {
            if length < 6 {
                return Err(RecordError::Truncated("SRV RDATA"));
            }
            let mut fixed = &raw[..6];
            let priority = fixed.get_u16();
            let weight = fixed.get_u16();
            let port = fixed.get_u16();
            let target = read_name(packet, start + 6, end)?;
            Ok(RData {
                text: target,
                priority: Some(priority),
                weight: Some(weight),
                port: Some(port),
            })
        }
        RecordType::SOA => decode_soa(packet, start, end),
        RecordType::TXT => decode_txt(raw),
        RecordType::CAA => decode_caa(raw),
        _ => Ok(RData::text(hex::encode(raw))),
    }
}

/// Produces the wire RDATA for `record`, validating its textual form.
pub fn encode_rdata(record: &DnsRecord) -> Result<Vec<u8>, RecordError> {
    let rdata = record.rdata.as_str();
    let mut bytes = BytesMut::new();

    match record.rtype {
        RecordType::A => {
            let ip: Ipv4Addr = rdata
                .parse()
                .map_err(|_| RecordError::InvalidAddress(rdata.to_string()))?;
            bytes.put_slice(&ip.octets());
        }
        RecordType::AAAA => {
            let ip: Ipv6Addr = rdata
                .parse()
                .map_err(|_| RecordError::InvalidAddress(rdata.to_string()))?;
            bytes.put_slice(&ip.octets());
        }
        RecordType::CNAME | RecordType::NS | RecordType::PTR => {
            bytes.put_slice(&encode_domain_name(rdata)?);
        }
        RecordType::MX => {
            let priority = record
                .priority
                .ok_or(RecordError::MissingField("MX", "priority"))?;
            bytes.put_u16(priority);
            bytes.put_slice(&encode_domain_name(rdata)?);
        }
        RecordType::SRV => {
            let priority = record
                .priority
                .ok_or(RecordError::MissingField("SRV", "priority"))?;
            let weight = record
                .weight
                .ok_or(RecordError::MissingField("SRV", "weight"))?;
            let port = record.port.ok_or(RecordError::MissingField("SRV", "port"))?;
            bytes.put_u16(priority);
            bytes.put_u16(weight);
            bytes.put_u16(port);
            bytes.put_slice(&encode_domain_name(rdata)?);
        }
        RecordType::SOA => encode_soa(rdata, &mut bytes)?,
        RecordType::TXT => encode_txt(rdata, &mut bytes),
        RecordType::CAA => encode_caa(rdata, &mut bytes)?,
        _ => {
            let raw = hex::decode(rdata).map_err(|_| RecordError::InvalidHex(rdata.to_string()))?;
            bytes.put_slice(&raw);
        }
    }

    Ok(bytes.to_vec())
}

/// Reads a name that must end exactly at `end`.
fn read_name(packet: &[u8], start: usize, end: usize) -> Result<String, RecordError> {
    let (name, next) = parse_domain_name(packet, start)?;
    if next != end {
        return Err(RecordError::RdataLengthMismatch {
            declared: end.saturating_sub(start),
            consumed: next - start,
        });
    }
    Ok(name)
}

/// Absolute form used in SOA text: trailing dot, root as ".".
fn absolute(name: &str) -> String {
    format!("{}.", name)
}

fn decode_soa(packet: &[u8], start: usize, end: usize) -> Result<RData, RecordError> {
    let (mname, next) = parse_domain_name(packet, start)?;
    let (rname, next) = parse_domain_name(packet, next)?;

    if next + 20 != end {
        return Err(RecordError::MalformedSoa(format!(
            "expected 20 bytes of timers after the names, found {}",
            end as isize - next as isize
        )));
    }

    let mut timers = &packet[next..end];
    let serial = timers.get_u32();
    let refresh = timers.get_u32();
    let retry = timers.get_u32();
    let expire = timers.get_u32();
    let minimum = timers.get_u32();

    Ok(RData::text(format!(
        "{} {} {} {} {} {} {}",
        absolute(&mname),
        absolute(&rname),
        serial,
        refresh,
        retry,
        expire,
        minimum
    )))
}

fn encode_soa(rdata: &str, bytes: &mut BytesMut) -> Result<(), RecordError> {
    let fields: Vec<&str> = rdata.split_whitespace().collect();
    let [mname, rname, timers @ ..] = fields.as_slice() else {
        return Err(RecordError::MalformedSoa(rdata.to_string()));
    };
    if timers.len() != 5 {
        return Err(RecordError::MalformedSoa(rdata.to_string()));
    }

    bytes.put_slice(&encode_domain_name(mname)?);
    bytes.put_slice(&encode_domain_name(rname)?);
    for timer in timers {
        let value: u32 = timer.parse().map_err(|_| RecordError::OutOfRange {
            field: "SOA timer",
            value: timer.to_string(),
        })?;
        bytes.put_u32(value);
    }
    Ok(())
}

fn decode_txt(raw: &[u8]) -> Result<RData, RecordError> {
    if raw.is_empty() {
        return Err(RecordError::MalformedTxt("no character-strings".to_string()));
    }

    let mut text = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while let Some((&length, tail)) = rest.split_first() {
        let length = usize::from(length);
        if length > tail.len() {
            return Err(RecordError::MalformedTxt(format!(
                "character-string of {} bytes with {} remaining",
                length,
                tail.len()
            )));
        }
        text.extend_from_slice(&tail[..length]);
        rest = &tail[length..];
    }

    String::from_utf8(text)
        .map(RData::text)
        .map_err(|_| RecordError::MalformedTxt("not valid UTF-8".to_string()))
}

fn encode_txt(rdata: &str, bytes: &mut BytesMut) {
    if rdata.is_empty() {
        bytes.put_u8(0);
        return;
    }
    for chunk in rdata.as_bytes().chunks(MAX_TXT_CHUNK) {
        bytes.put_u8(chunk.len() as u8);
        bytes.put_slice(chunk);
    }
}

fn decode_caa(raw: &[u8]) -> Result<RData, RecordError> {
    let [flags, tag_length, rest @ ..] = raw else {
        return Err(RecordError::MalformedCaa("shorter than 2 bytes".to_string()));
    };
    let tag_length = usize::from(*tag_length);
    if tag_length == 0 || tag_length > rest.len() {
        return Err(RecordError::MalformedCaa(format!(
            "tag length {} with {} bytes remaining",
            tag_length,
            rest.len()
        )));
    }

    let (tag, value) = rest.split_at(tag_length);
    let tag = std::str::from_utf8(tag)
        .map_err(|_| RecordError::MalformedCaa("tag is not valid UTF-8".to_string()))?;
    let value = std::str::from_utf8(value)
        .map_err(|_| RecordError::MalformedCaa("value is not valid UTF-8".to_string()))?;

    Ok(RData::text(format!("{} {} \"{}\"", flags, tag, value)))
}

/// Parses `<flags> <tag> "<value>"`.
fn encode_caa(rdata: &str, bytes: &mut BytesMut) -> Result<(), RecordError> {
    let malformed = || RecordError::MalformedCaa(rdata.to_string());

    let (flags, rest) = rdata.trim().split_once(' ').ok_or_else(malformed)?;
    let (tag, value) = rest.trim_start().split_once(' ').ok_or_else(malformed)?;
    let value = value
        .trim()
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(malformed)?;

    let flags: u32 = flags.parse().map_err(|_| malformed())?;
    let flags = u8::try_from(flags).map_err(|_| RecordError::OutOfRange {
        field: "CAA flags",
        value: flags.to_string(),
    })?;
    if tag.is_empty() || tag.len() > 255 {
        return Err(malformed());
    }

    bytes.put_u8(flags);
    bytes.put_u8(tag.len() as u8);
    bytes.put_slice(tag.as_bytes());
    bytes.put_slice(value.as_bytes());
    Ok(())
}
