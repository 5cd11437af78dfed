//! Authoritative DNS: a wire-format codec for DNS messages and a zone
//! resolver that answers queries from one static zone.
//!
//! The codec and resolver are plain functions over immutable values; the
//! `server` and `forwarder` modules are thin UDP adapters around them.

pub mod config;
pub mod dns_header;
pub mod dns_message;
pub mod dns_name;
pub mod dns_question_and_answer;
pub mod dns_rdata;
pub mod error;
pub mod forwarder;
pub mod resolver;
pub mod server;
pub mod zone;

pub use dns_header::{DnsFlags, DnsHeader, ReservedBits, ResponseCode};
pub use dns_message::{DnsMessage, ResponseFlags};
pub use dns_question_and_answer::{DnsQuestion, DnsRecord, RecordClass, RecordType};
pub use error::{
    ConfigError, ForwardError, HeaderError, MessageError, NameError, RecordError, ZoneError,
};
pub use resolver::{lookup, lookup_with_rng};
pub use zone::Zone;
