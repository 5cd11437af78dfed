use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dns_header::{ReservedBits, ResponseCode, OPCODE_QUERY};
use crate::dns_message::{DnsMessage, ResponseFlags};
use crate::dns_question_and_answer::{DnsRecord, RecordType};
use crate::error::MessageError;
use crate::resolver::lookup;
use crate::zone::Zone;

/// Largest UDP payload without EDNS.
pub const MAX_UDP_PAYLOAD: usize = 512;

/// DNS Server that answers UDP requests from one zone
pub struct DnsServer {
    socket: UdpSocket,
    zone: Arc<Zone>,
    reserved: ReservedBits,
}

impl DnsServer {
    /// Create a new DNS server bound to the given address
    pub fn new(
        bind_addr: SocketAddr,
        zone: Arc<Zone>,
        reserved: ReservedBits,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(bind_addr)?;
        Ok(Self {
            socket,
            zone,
            reserved,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run the DNS server main loop
    /// Listens for incoming requests and sends responses
    pub fn run(&self) -> std::io::Result<()> {
        let mut buf = [0u8; MAX_UDP_PAYLOAD];
        info!(addr = %self.local_addr()?, zone = self.zone.name(), "listening");

        loop {
            let (size, source) = self.socket.recv_from(&mut buf)?;
            debug!(bytes = size, %source, "request");

            let response = handle_request(&buf[..size], &self.zone, self.reserved);
            if response.is_empty() {
                continue;
            }
            if let Err(e) = self.socket.send_to(&response, source) {
                warn!(%source, error = %e, "failed to send response");
            }
        }
    }
}

/// Handle a DNS request: parse, resolve, and build response.
/// An empty result means the datagram should be dropped.
pub fn handle_request(buf: &[u8], zone: &Zone, reserved: ReservedBits) -> Vec<u8> {
    let query = match DnsMessage::from_bytes_with(buf, reserved) {
        Ok(query) => query,
        Err(e) => {
            debug!(error = %e, "dropping undecodable request");
            return Vec::new();
        }
    };

    if query.flags().is_response {
        debug!(id = query.id(), "dropping response sent as a request");
        return Vec::new();
    }

    let response = if query.flags().opcode != OPCODE_QUERY {
        debug!(opcode = query.flags().opcode, "opcode not implemented");
        error_response(&query, ResponseCode::NotImp)
    } else {
        lookup(&query, zone).or_else(|e| {
            warn!(id = query.id(), error = %e, "lookup failed");
            error_response(&query, ResponseCode::ServFail)
        })
    };

    match response.and_then(|r| encode_for_udp(&query, &r)) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(id = query.id(), error = %e, "failed to encode response");
            Vec::new()
        }
    }
}

fn error_response(query: &DnsMessage, code: ResponseCode) -> Result<DnsMessage, MessageError> {
    DnsMessage::response(query, code, vec![], vec![], vec![], ResponseFlags::default())
}

/// Encodes `response`, replacing it with a TC=1 reply when it does not fit a
/// single datagram. The truncated reply keeps the question and any SOA from
/// the authority section, so an NXDOMAIN stays well-formed.
fn encode_for_udp(query: &DnsMessage, response: &DnsMessage) -> Result<Vec<u8>, MessageError> {
    let bytes = response.to_bytes()?;
    if bytes.len() <= MAX_UDP_PAYLOAD {
        return Ok(bytes);
    }

    debug!(id = query.id(), size = bytes.len(), "truncating response");
    let soa: Vec<DnsRecord> = response
        .authority()
        .iter()
        .filter(|r| r.rtype == RecordType::SOA)
        .cloned()
        .collect();
    let truncated = DnsMessage::response(
        query,
        response.response_code(),
        vec![],
        soa,
        vec![],
        ResponseFlags {
            authoritative: response.flags().authoritative,
            truncated: true,
            recursion_available: false,
        },
    )?;
    truncated.to_bytes()
}
