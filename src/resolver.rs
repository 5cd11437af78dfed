//! Authoritative answers from a single static zone (RFC 1034 §4.3.2 without
//! recursion). CNAMEs are returned as found, never chased.

use tracing::{debug, trace};

use crate::dns_header::ResponseCode;
use crate::dns_message::{DnsMessage, ResponseFlags};
use crate::dns_question_and_answer::{DnsRecord, RecordClass, RecordType};
use crate::error::MessageError;
use crate::zone::Zone;

const AUTHORITATIVE: ResponseFlags = ResponseFlags {
    authoritative: true,
    truncated: false,
    recursion_available: false,
};

const REFERRAL: ResponseFlags = ResponseFlags {
    authoritative: false,
    truncated: false,
    recursion_available: false,
};

/// Answers `query` from `zone`, shuffling RRsets with process-wide randomness.
pub fn lookup(query: &DnsMessage, zone: &Zone) -> Result<DnsMessage, MessageError> {
    lookup_with_rng(query, zone, &mut fastrand::Rng::new())
}

/// Answers `query` from `zone`, shuffling matching RRsets with `rng`.
///
/// The only error is an RRset too large for a 16-bit section count.
pub fn lookup_with_rng(
    query: &DnsMessage,
    zone: &Zone,
    rng: &mut fastrand::Rng,
) -> Result<DnsMessage, MessageError> {
    let Some(question) = query.question() else {
        debug!(id = query.id(), "query without a question");
        return DnsMessage::response(
            query,
            ResponseCode::FormErr,
            vec![],
            vec![],
            vec![],
            AUTHORITATIVE,
        );
    };
    let qname = question.name.as_str();
    let qtype = question.qtype;
    let qclass = question.qclass;

    if zone.contains_name(qname) {
        if let Some(response) = referral(query, zone, qname, qclass) {
            return response;
        }
        return answer_from(query, zone, qname, qname, qtype, qclass, rng);
    }

    match wildcard_owner(zone, qname) {
        Some(owner) if covers(&owner, qname) => {
            if let Some(response) = referral(query, zone, &owner, qclass) {
                return response;
            }
            trace!(%question, wildcard = %owner, "wildcard match");
            answer_from(query, zone, &owner, qname, qtype, qclass, rng)
        }
        _ => {
            debug!(%question, "no such name");
            DnsMessage::response(
                query,
                ResponseCode::NxDomain,
                vec![],
                vec![zone.soa().clone()],
                vec![],
                AUTHORITATIVE,
            )
        }
    }
}

/// A non-authoritative referral to the NS set of the cut above `owner`, if
/// `owner` sits in a delegated subtree that has NS records in `qclass`.
fn referral(
    query: &DnsMessage,
    zone: &Zone,
    owner: &str,
    qclass: RecordClass,
) -> Option<Result<DnsMessage, MessageError>> {
    let cut = zone.delegation_for(owner)?;
    let ns: Vec<DnsRecord> = zone
        .records_at(cut)
        .filter(|r| r.rtype == RecordType::NS && r.rclass == qclass)
        .cloned()
        .collect();
    if ns.is_empty() {
        return None;
    }

    debug!(owner, delegation = cut, "referral");
    Some(DnsMessage::response(
        query,
        ResponseCode::NoError,
        vec![],
        ns,
        vec![],
        REFERRAL,
    ))
}

/// The most specific `*.<suffix>` owner present in the zone, trying every
/// proper ancestor of `qname` from longest to shortest.
fn wildcard_owner(zone: &Zone, qname: &str) -> Option<String> {
    let labels: Vec<&str> = qname.split('.').collect();
    (1..labels.len())
        .map(|skip| format!("*.{}", labels[skip..].join(".")))
        .find(|candidate| zone.contains_name(candidate))
}

/// True if `owner` is `*.<suffix>` and `qname` is exactly one label below
/// `suffix`. A wildcard never answers for names deeper than that.
fn covers(owner: &str, qname: &str) -> bool {
    match (owner.strip_prefix("*."), qname.split_once('.')) {
        (Some(suffix), Some((_, parent))) => parent == suffix,
        _ => false,
    }
}

/// Builds the positive or NODATA answer for the `qclass` records at `owner`,
/// renaming them to `qname` when they come from a wildcard.
fn answer_from(
    query: &DnsMessage,
    zone: &Zone,
    owner: &str,
    qname: &str,
    qtype: RecordType,
    qclass: RecordClass,
    rng: &mut fastrand::Rng,
) -> Result<DnsMessage, MessageError> {
    let synthesize = |record: &DnsRecord| {
        if record.name == qname {
            record.clone()
        } else {
            record.with_name(qname)
        }
    };
    let rrset = |rtype: RecordType| -> Vec<DnsRecord> {
        zone.records_at(owner)
            .filter(|r| r.rtype == rtype && r.rclass == qclass)
            .map(synthesize)
            .collect()
    };

    let mut answers = rrset(qtype);
    if !answers.is_empty() {
        rng.shuffle(&mut answers);
        trace!(owner, count = answers.len(), "answer");
        return DnsMessage::response(
            query,
            ResponseCode::NoError,
            answers,
            vec![],
            vec![],
            AUTHORITATIVE,
        );
    }

    let cnames = rrset(RecordType::CNAME);
    if !cnames.is_empty() {
        trace!(owner, "cname");
        return DnsMessage::response(
            query,
            ResponseCode::NoError,
            cnames,
            vec![],
            vec![],
            AUTHORITATIVE,
        );
    }

    trace!(owner, %qtype, "nodata");
    DnsMessage::response(
        query,
        ResponseCode::NoError,
        vec![],
        vec![zone.soa().clone()],
        vec![],
        AUTHORITATIVE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns_header::{DnsFlags, DnsHeader};
    use crate::dns_question_and_answer::DnsQuestion;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    fn soa() -> DnsRecord {
        DnsRecord::new(
            "example.com",
            RecordType::SOA,
            RecordClass::IN,
            3600,
            "ns1.example.com. hostmaster.example.com. 1 7200 3600 1209600 300",
        )
    }

    fn a(name: &str, ip: [u8; 4]) -> DnsRecord {
        DnsRecord::new_a_record(name, 300, Ipv4Addr::from(ip))
    }

    fn record(name: &str, rtype: RecordType, rdata: &str) -> DnsRecord {
        DnsRecord::new(name, rtype, RecordClass::IN, 300, rdata)
    }

    fn zone(extra: Vec<DnsRecord>) -> Zone {
        let mut records = vec![soa(), record("example.com", RecordType::NS, "ns1.example.com")];
        records.extend(extra);
        Zone::new("example.com", records).unwrap()
    }

    fn ask(zone: &Zone, name: &str, qtype: RecordType) -> DnsMessage {
        ask_in(zone, name, qtype, RecordClass::IN)
    }

    fn ask_in(zone: &Zone, name: &str, qtype: RecordType, qclass: RecordClass) -> DnsMessage {
        let query = DnsMessage::query(DnsQuestion::new(name, qtype, qclass), Some(42), true);
        lookup_with_rng(&query, zone, &mut fastrand::Rng::with_seed(7)).unwrap()
    }

    fn set(records: &[DnsRecord]) -> HashSet<String> {
        records.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_missing_question_is_formerr() {
        let header = DnsHeader {
            id: 5,
            flags: DnsFlags::default(),
            question_count: 0,
            answer_count: 0,
            authority_count: 0,
            additional_count: 0,
        };
        let query = DnsMessage::new(header, vec![], vec![], vec![], vec![]).unwrap();
        let response = lookup(&query, &zone(vec![])).unwrap();

        assert_eq!(response.response_code(), ResponseCode::FormErr);
        assert!(response.flags().authoritative);
        assert!(response.questions().is_empty());
        assert_eq!(response.id(), 5);
    }

    #[test]
    fn test_exact_match_returns_whole_rrset() {
        let records = vec![
            a("www.example.com", [1, 1, 1, 1]),
            a("www.example.com", [2, 2, 2, 2]),
            a("www.example.com", [3, 3, 3, 3]),
        ];
        let zone = zone(records.clone());
        let response = ask(&zone, "WWW.example.com", RecordType::A);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.flags().authoritative);
        assert!(!response.flags().recursion_available);
        assert!(response.flags().recursion_desired);
        assert_eq!(response.id(), 42);
        assert_eq!(set(response.answers()), set(&records));
        assert!(response.authority().is_empty());
    }

    #[test]
    fn test_rrset_order_is_randomized() {
        let records: Vec<DnsRecord> = (1..=8)
            .map(|i| a("www.example.com", [10, 0, 0, i]))
            .collect();
        let zone = zone(records);
        let query = DnsMessage::query(
            DnsQuestion::new("www.example.com", RecordType::A, RecordClass::IN),
            Some(1),
            false,
        );

        let mut rng = fastrand::Rng::with_seed(1);
        let orders: HashSet<Vec<String>> = (0..20)
            .map(|_| {
                lookup_with_rng(&query, &zone, &mut rng)
                    .unwrap()
                    .answers()
                    .iter()
                    .map(|r| r.rdata.clone())
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn test_cname_is_returned_not_chased() {
        let zone = zone(vec![
            record("alias.example.com", RecordType::CNAME, "www.example.com"),
            a("www.example.com", [1, 1, 1, 1]),
        ]);
        let response = ask(&zone, "alias.example.com", RecordType::A);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.flags().authoritative);
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].rtype, RecordType::CNAME);
        assert_eq!(response.answers()[0].rdata, "www.example.com");
    }

    #[test]
    fn test_nodata_carries_soa() {
        let zone = zone(vec![a("www.example.com", [1, 1, 1, 1])]);
        let response = ask(&zone, "www.example.com", RecordType::AAAA);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.answers().is_empty());
        assert_eq!(response.authority(), &[soa()]);
        assert!(response.flags().authoritative);
    }

    #[test]
    fn test_nxdomain_carries_only_soa() {
        let zone = zone(vec![a("www.example.com", [1, 1, 1, 1])]);
        for name in ["missing.example.com", "www.other.org", "a.www.example.com"] {
            let response = ask(&zone, name, RecordType::A);
            assert_eq!(response.response_code(), ResponseCode::NxDomain);
            assert!(response.answers().is_empty());
            assert_eq!(response.authority(), &[soa()]);
            assert!(response.flags().authoritative);
        }
    }

    #[test]
    fn test_wildcard_synthesis() {
        let zone = zone(vec![a("*.sub.example.com", [1, 1, 1, 1])]);
        let response = ask(&zone, "x.sub.example.com", RecordType::A);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.flags().authoritative);
        assert_eq!(response.answers().len(), 1);
        let answer = &response.answers()[0];
        assert_eq!(answer.name, "x.sub.example.com");
        assert_eq!(answer.rtype, RecordType::A);
        assert_eq!(answer.rdata, "1.1.1.1");

        // The zone itself is untouched.
        assert!(zone.contains_name("*.sub.example.com"));
        assert!(!zone.contains_name("x.sub.example.com"));
    }

    #[test]
    fn test_wildcard_prefers_most_specific() {
        let zone = zone(vec![
            a("*.example.com", [1, 1, 1, 1]),
            a("*.sub.example.com", [2, 2, 2, 2]),
        ]);
        let sub = ask(&zone, "x.sub.example.com", RecordType::A);
        assert_eq!(sub.answers()[0].rdata, "2.2.2.2");
        let apex = ask(&zone, "y.example.com", RecordType::A);
        assert_eq!(apex.answers()[0].rdata, "1.1.1.1");

        // `*.example.com` only answers one label below the apex.
        let deep = ask(&zone, "a.b.example.com", RecordType::A);
        assert_eq!(deep.response_code(), ResponseCode::NxDomain);
        assert!(deep.answers().is_empty());
        assert_eq!(deep.authority(), &[soa()]);
    }

    #[test]
    fn test_empty_non_terminal_blocks_wildcard() {
        let zone = zone(vec![
            a("*.example.com", [1, 1, 1, 1]),
            a("host.b.example.com", [2, 2, 2, 2]),
        ]);
        let response = ask(&zone, "a.b.example.com", RecordType::A);

        assert_eq!(response.response_code(), ResponseCode::NxDomain);
        assert!(response.answers().is_empty());
        assert_eq!(response.authority(), &[soa()]);
        assert!(response.flags().authoritative);
    }

    #[test]
    fn test_wildcard_does_not_answer_below_a_cut() {
        let zone = zone(vec![
            a("*.example.com", [1, 1, 1, 1]),
            record("child.example.com", RecordType::NS, "ns1.child.example.com"),
        ]);
        let response = ask(&zone, "x.child.example.com", RecordType::A);

        assert_eq!(response.response_code(), ResponseCode::NxDomain);
        assert!(response.answers().is_empty());
        assert_eq!(response.authority(), &[soa()]);
    }

    #[test]
    fn test_wildcard_inside_a_cut_is_referred() {
        let zone = zone(vec![
            record("child.example.com", RecordType::NS, "ns1.child.example.com"),
            a("*.child.example.com", [1, 1, 1, 1]),
        ]);
        let response = ask(&zone, "x.child.example.com", RecordType::A);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(!response.flags().authoritative);
        assert!(response.answers().is_empty());
        assert_eq!(response.authority()[0].name, "child.example.com");
        assert_eq!(response.authority()[0].rtype, RecordType::NS);
    }

    #[test]
    fn test_wildcard_keeps_srv_fields_and_falls_back_to_cname() {
        let zone = zone(vec![
            DnsRecord::new_srv_record("*.svc.example.com", 300, 1, 2, 8080, "t.example.com"),
            record("*.web.example.com", RecordType::CNAME, "www.example.com"),
        ]);

        let srv = ask(&zone, "x.svc.example.com", RecordType::SRV);
        let answer = &srv.answers()[0];
        assert_eq!(answer.name, "x.svc.example.com");
        assert_eq!(
            (answer.priority, answer.weight, answer.port),
            (Some(1), Some(2), Some(8080))
        );

        let cname = ask(&zone, "x.web.example.com", RecordType::A);
        assert_eq!(cname.answers()[0].rtype, RecordType::CNAME);
        assert_eq!(cname.answers()[0].name, "x.web.example.com");

        let nodata = ask(&zone, "x.svc.example.com", RecordType::TXT);
        assert_eq!(nodata.response_code(), ResponseCode::NoError);
        assert!(nodata.answers().is_empty());
        assert_eq!(nodata.authority(), &[soa()]);
    }

    #[test]
    fn test_delegation_is_a_referral() {
        let ns = vec![
            record("child.example.com", RecordType::NS, "ns1.child.example.com"),
            record("child.example.com", RecordType::NS, "ns2.child.example.com"),
        ];
        let zone = zone(ns.clone());
        let response = ask(&zone, "child.example.com", RecordType::A);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.answers().is_empty());
        assert_eq!(set(response.authority()), set(&ns));
        assert!(!response.flags().authoritative);
    }

    #[test]
    fn test_glue_below_cut_is_referred() {
        let zone = zone(vec![
            record("child.example.com", RecordType::NS, "ns1.child.example.com"),
            a("ns1.child.example.com", [9, 9, 9, 9]),
        ]);
        let response = ask(&zone, "ns1.child.example.com", RecordType::A);

        assert!(!response.flags().authoritative);
        assert!(response.answers().is_empty());
        assert_eq!(response.authority()[0].name, "child.example.com");
    }

    #[test]
    fn test_apex_ns_is_answered() {
        let zone = zone(vec![]);
        let response = ask(&zone, "example.com", RecordType::NS);
        assert!(response.flags().authoritative);
        assert_eq!(response.answers().len(), 1);
        assert_eq!(response.answers()[0].rdata, "ns1.example.com");
    }

    #[test]
    fn test_other_class_gets_nodata() {
        let zone = zone(vec![a("www.example.com", [1, 1, 1, 1])]);
        let response = ask_in(&zone, "www.example.com", RecordType::A, RecordClass::CH);

        assert_eq!(response.response_code(), ResponseCode::NoError);
        assert!(response.flags().authoritative);
        assert!(response.answers().is_empty());
        assert_eq!(response.authority(), &[soa()]);
    }

    #[test]
    fn test_covers() {
        assert!(covers("*.example.com", "a.example.com"));
        assert!(!covers("*.example.com", "a.b.example.com"));
        assert!(!covers("*.example.com", "example.com"));
        assert!(!covers("*.example.com", "aexample.com"));
        assert!(!covers("www.example.com", "www.example.com"));
    }
}
