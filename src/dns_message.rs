use bytes::{BufMut, BytesMut};

use crate::dns_header::{DnsFlags, DnsHeader, ReservedBits, ResponseCode, HEADER_LEN};
use crate::dns_question_and_answer::{DnsQuestion, DnsRecord, RecordType};
use crate::error::MessageError;

/// Header bits a responder chooses; everything else is copied from the query
/// or derived from the sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseFlags {
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_available: bool,
}

/// A complete DNS message. Section lengths always agree with the header
/// counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsMessage {
    header: DnsHeader,
    questions: Vec<DnsQuestion>,
    answers: Vec<DnsRecord>,
    authority: Vec<DnsRecord>,
    additional: Vec<DnsRecord>,
}

impl DnsMessage {
    /// Assembles a message, rejecting count mismatches, out-of-range header
    /// fields, NXDOMAIN responses without an SOA, and complete authoritative
    /// NODATA responses without an SOA.
    pub fn new(
        header: DnsHeader,
        questions: Vec<DnsQuestion>,
        answers: Vec<DnsRecord>,
        authority: Vec<DnsRecord>,
        additional: Vec<DnsRecord>,
    ) -> Result<Self, MessageError> {
        header.flags.validate()?;

        check_count("question", header.question_count, questions.len())?;
        check_count("answer", header.answer_count, answers.len())?;
        check_count("authority", header.authority_count, authority.len())?;
        check_count("additional", header.additional_count, additional.len())?;

        let flags = &header.flags;
        if flags.is_response {
            let negative = match flags.response_code {
                ResponseCode::NxDomain => Some("NXDOMAIN"),
                // Referrals are NOERROR with no answers too, but never AA.
                ResponseCode::NoError
                    if answers.is_empty() && flags.authoritative && !flags.truncated =>
                {
                    Some("NODATA")
                }
                _ => None,
            };
            if let Some(kind) = negative {
                if !authority.iter().any(|r| r.rtype == RecordType::SOA) {
                    return Err(MessageError::MissingSoa(kind));
                }
            }
        }

        Ok(DnsMessage {
            header,
            questions,
            answers,
            authority,
            additional,
        })
    }

    /// Builds a single-question query. A random id is used when none is given.
    pub fn query(question: DnsQuestion, id: Option<u16>, recursion_desired: bool) -> Self {
        let header = DnsHeader {
            id: id.unwrap_or_else(|| fastrand::u16(..)),
            flags: DnsFlags {
                recursion_desired,
                ..DnsFlags::default()
            },
            question_count: 1,
            answer_count: 0,
            authority_count: 0,
            additional_count: 0,
        };

        DnsMessage {
            header,
            questions: vec![question],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
        }
    }

    /// Builds a response to `query`: id, opcode, RD and the question section
    /// are echoed, counts come from the supplied sections.
    pub fn response(
        query: &DnsMessage,
        response_code: ResponseCode,
        answers: Vec<DnsRecord>,
        authority: Vec<DnsRecord>,
        additional: Vec<DnsRecord>,
        flags: ResponseFlags,
    ) -> Result<Self, MessageError> {
        let request_flags = &query.header.flags;

        let header = DnsHeader {
            id: query.header.id,
            flags: DnsFlags {
                is_response: true,
                opcode: request_flags.opcode,
                authoritative: flags.authoritative,
                truncated: flags.truncated,
                recursion_desired: request_flags.recursion_desired,
                recursion_available: flags.recursion_available,
                z: 0,
                response_code,
            },
            question_count: section_count("question", &query.questions)?,
            answer_count: section_count("answer", &answers)?,
            authority_count: section_count("authority", &authority)?,
            additional_count: section_count("additional", &additional)?,
        };

        DnsMessage::new(
            header,
            query.questions.clone(),
            answers,
            authority,
            additional,
        )
    }

    /// Parse a DNS message from the buffer, ignoring reserved header bits
    pub fn from_bytes(packet: &[u8]) -> Result<Self, MessageError> {
        Self::from_bytes_with(packet, ReservedBits::Ignore)
    }

    /// Parse a DNS message; every byte of `packet` must belong to a section.
    pub fn from_bytes_with(packet: &[u8], reserved: ReservedBits) -> Result<Self, MessageError> {
        let header = DnsHeader::from_bytes(packet, reserved)?;
        let mut offset = HEADER_LEN;

        let mut questions = Vec::with_capacity(header.question_count.into());
        for _ in 0..header.question_count {
            let (question, new_offset) = DnsQuestion::from_bytes(packet, offset)?;
            questions.push(question);
            offset = new_offset;
        }

        let mut sections: [Vec<DnsRecord>; 3] = Default::default();
        let counts = [
            header.answer_count,
            header.authority_count,
            header.additional_count,
        ];
        for (section, count) in sections.iter_mut().zip(counts) {
            for _ in 0..count {
                let (record, new_offset) = DnsRecord::from_bytes(packet, offset)?;
                section.push(record);
                offset = new_offset;
            }
        }

        if offset != packet.len() {
            return Err(MessageError::TrailingBytes(packet.len() - offset));
        }

        let [answers, authority, additional] = sections;
        DnsMessage::new(header, questions, answers, authority, additional)
    }

    /// Build the complete DNS message
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = BytesMut::with_capacity(512);

        bytes.put_slice(&self.header.to_bytes());

        for question in &self.questions {
            bytes.put_slice(&question.to_bytes()?);
        }

        for record in self.answers.iter().chain(&self.authority).chain(&self.additional) {
            bytes.put_slice(&record.to_bytes()?);
        }

        Ok(bytes.to_vec())
    }

    pub fn header(&self) -> &DnsHeader {
        &self.header
    }

    pub fn id(&self) -> u16 {
        self.header.id
    }

    pub fn flags(&self) -> &DnsFlags {
        &self.header.flags
    }

    pub fn response_code(&self) -> ResponseCode {
        self.header.flags.response_code
    }

    pub fn questions(&self) -> &[DnsQuestion] {
        &self.questions
    }

    /// The first question, which is the only one standard queries carry.
    pub fn question(&self) -> Option<&DnsQuestion> {
        self.questions.first()
    }

    pub fn answers(&self) -> &[DnsRecord] {
        &self.answers
    }

    pub fn authority(&self) -> &[DnsRecord] {
        &self.authority
    }

    pub fn additional(&self) -> &[DnsRecord] {
        &self.additional
    }
}

fn check_count(section: &'static str, declared: u16, actual: usize) -> Result<(), MessageError> {
    if usize::from(declared) != actual {
        return Err(MessageError::CountMismatch {
            section,
            declared,
            actual,
        });
    }
    Ok(())
}

fn section_count<T>(section: &'static str, entries: &[T]) -> Result<u16, MessageError> {
    u16::try_from(entries.len()).map_err(|_| MessageError::TooManyEntries(section))
}
