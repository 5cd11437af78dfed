use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::dns_message::DnsMessage;
use crate::dns_question_and_answer::DnsQuestion;
use crate::error::ForwardError;

/// Largest datagram accepted from upstream.
const MAX_RESPONSE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy)]
pub struct ForwardOptions {
    pub timeout: Duration,
    pub recursion_desired: bool,
}

impl Default for ForwardOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            recursion_desired: true,
        }
    }
}

/// Sends a single-question query to `upstream` and waits for its answer.
///
/// Datagrams that do not decode, come from another address, or do not match
/// the query's id and question are ignored until the timeout runs out.
pub fn forward_query(
    upstream: SocketAddr,
    question: &DnsQuestion,
    options: ForwardOptions,
) -> Result<DnsMessage, ForwardError> {
    let bind_addr: SocketAddr = if upstream.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(bind_addr)?;

    let query = DnsMessage::query(question.clone(), None, options.recursion_desired);
    socket.send_to(&query.to_bytes()?, upstream)?;
    debug!(%upstream, id = query.id(), %question, "query sent");

    let deadline = Instant::now() + options.timeout;
    let mut buf = [0u8; MAX_RESPONSE_SIZE];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ForwardError::Timeout {
                upstream: upstream.to_string(),
                timeout: options.timeout,
            });
        }
        socket.set_read_timeout(Some(remaining))?;

        let (size, source) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if source != upstream {
            debug!(%source, "ignoring datagram from unexpected source");
            continue;
        }

        match DnsMessage::from_bytes(&buf[..size]) {
            Ok(response) if matches_query(&query, &response) => return Ok(response),
            Ok(response) => {
                warn!(expected = query.id(), got = response.id(), "ignoring mismatched response");
            }
            Err(e) => {
                warn!(error = %e, "ignoring undecodable response");
            }
        }
    }
}

/// A reply belongs to `query` when it is a response with the same id and
/// echoes the same question.
pub fn matches_query(query: &DnsMessage, response: &DnsMessage) -> bool {
    response.flags().is_response
        && response.id() == query.id()
        && response.question() == query.question()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns_header::ResponseCode;
    use crate::dns_message::ResponseFlags;
    use crate::dns_question_and_answer::{DnsRecord, RecordClass, RecordType};
    use std::net::Ipv4Addr;
    use std::thread;

    fn question() -> DnsQuestion {
        DnsQuestion::new("www.example.com", RecordType::A, RecordClass::IN)
    }

    fn answer_for(query: &DnsMessage, id_offset: u16) -> Vec<u8> {
        let query = DnsMessage::query(
            query.question().unwrap().clone(),
            Some(query.id().wrapping_add(id_offset)),
            true,
        );
        DnsMessage::response(
            &query,
            ResponseCode::NoError,
            vec![DnsRecord::new_a_record("www.example.com", 60, Ipv4Addr::new(5, 6, 7, 8))],
            vec![],
            vec![],
            ResponseFlags::default(),
        )
        .unwrap()
        .to_bytes()
        .unwrap()
    }

    #[test]
    fn test_matches_query() {
        let query = DnsMessage::query(question(), Some(10), true);
        let good = DnsMessage::from_bytes(&answer_for(&query, 0)).unwrap();
        let wrong_id = DnsMessage::from_bytes(&answer_for(&query, 1)).unwrap();

        assert!(matches_query(&query, &good));
        assert!(!matches_query(&query, &wrong_id));
        assert!(!matches_query(&query, &query));
    }

    #[test]
    fn test_forward_skips_mismatched_ids() {
        let upstream = UdpSocket::bind("127.0.0.1:0").unwrap();
        let upstream_addr = upstream.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (size, client) = upstream.recv_from(&mut buf).unwrap();
            let query = DnsMessage::from_bytes(&buf[..size]).unwrap();
            upstream.send_to(&answer_for(&query, 1), client).unwrap();
            upstream.send_to(&[0xff; 3], client).unwrap();
            upstream.send_to(&answer_for(&query, 0), client).unwrap();
        });

        let response =
            forward_query(upstream_addr, &question(), ForwardOptions::default()).unwrap();
        handle.join().unwrap();

        assert_eq!(response.answers()[0].rdata, "5.6.7.8");
    }

    #[test]
    fn test_forward_times_out() {
        let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
        let options = ForwardOptions {
            timeout: Duration::from_millis(50),
            ..ForwardOptions::default()
        };

        let err = forward_query(silent.local_addr().unwrap(), &question(), options).unwrap_err();
        assert!(matches!(err, ForwardError::Timeout { .. }));
    }
}
