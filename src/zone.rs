use tracing::debug;

use crate::dns_name::{is_subdomain_of, normalize_name};
use crate::dns_question_and_answer::{DnsRecord, RecordType};
use crate::error::ZoneError;

/// An authoritative zone. Built once and only read afterwards; reloading
/// means building a new `Zone` and swapping it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    name: String,
    records: Vec<DnsRecord>,
    soa: DnsRecord,
}

impl Zone {
    /// Builds a zone from its records. Owner names are normalized, every
    /// record must sit at or below `name`, and there must be exactly one
    /// SOA, owned by the apex.
    pub fn new(name: &str, records: Vec<DnsRecord>) -> Result<Self, ZoneError> {
        let name = normalize_name(name);

        let records: Vec<DnsRecord> = records
            .into_iter()
            .map(|record| {
                let owner = normalize_name(&record.name);
                if is_subdomain_of(&owner, &name) {
                    Ok(record.with_name(&owner))
                } else {
                    Err(ZoneError::OutOfZone {
                        record: record.name,
                        zone: name.clone(),
                    })
                }
            })
            .collect::<Result<_, _>>()?;

        let mut soas = records.iter().filter(|r| r.rtype == RecordType::SOA);
        let soa = soas
            .next()
            .cloned()
            .ok_or_else(|| ZoneError::MissingSoa(name.clone()))?;
        if soas.next().is_some() {
            return Err(ZoneError::MultipleSoa(name));
        }
        if soa.name != name {
            return Err(ZoneError::SoaNotAtApex {
                owner: soa.name,
                apex: name,
            });
        }

        debug!(zone = %name, records = records.len(), "zone built");
        Ok(Zone { name, records, soa })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[DnsRecord] {
        &self.records
    }

    pub fn soa(&self) -> &DnsRecord {
        &self.soa
    }

    /// Records owned by exactly `name` (normalized).
    pub fn records_at<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DnsRecord> + 'a {
        self.records.iter().filter(move |r| r.name == name)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.records.iter().any(|r| r.name == name)
    }

    /// The topmost delegation point covering `name`: an owner strictly below
    /// the apex, equal to or above `name`, that holds NS records.
    pub fn delegation_for(&self, name: &str) -> Option<&str> {
        self.records
            .iter()
            .filter(|r| r.rtype == RecordType::NS && r.name != self.name)
            .filter(|r| is_subdomain_of(name, &r.name))
            .map(|r| r.name.as_str())
            .min_by_key(|owner| owner.len())
    }

    /// False exactly when `name` lies in a subtree delegated away from this
    /// zone. The apex is always authoritative.
    pub fn is_authoritative(&self, name: &str) -> bool {
        self.delegation_for(name).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns_question_and_answer::RecordClass;
    use std::net::Ipv4Addr;

    fn soa(owner: &str) -> DnsRecord {
        DnsRecord::new(
            owner,
            RecordType::SOA,
            RecordClass::IN,
            3600,
            "ns1.example.com. hostmaster.example.com. 1 7200 3600 1209600 300",
        )
    }

    fn ns(owner: &str, target: &str) -> DnsRecord {
        DnsRecord::new(owner, RecordType::NS, RecordClass::IN, 3600, target)
    }

    fn zone() -> Zone {
        Zone::new(
            "Example.com.",
            vec![
                soa("example.com"),
                ns("example.com", "ns1.example.com"),
                DnsRecord::new_a_record("WWW.example.com", 60, Ipv4Addr::new(1, 2, 3, 4)),
                ns("child.example.com", "ns1.child.example.com"),
                ns("deep.child.example.com", "ns.deep.child.example.com"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_names_are_normalized() {
        let zone = zone();
        assert_eq!(zone.name(), "example.com");
        assert!(zone.contains_name("www.example.com"));
        assert_eq!(zone.records_at("www.example.com").count(), 1);
        assert_eq!(zone.soa().rtype, RecordType::SOA);
    }

    #[test]
    fn test_apex_is_authoritative() {
        let zone = zone();
        assert!(zone.is_authoritative("example.com"));
        assert!(zone.is_authoritative("www.example.com"));
    }

    #[test]
    fn test_delegated_subtree_is_not_authoritative() {
        let zone = zone();
        assert!(!zone.is_authoritative("child.example.com"));
        assert!(!zone.is_authoritative("host.child.example.com"));
        assert_eq!(
            zone.delegation_for("x.deep.child.example.com"),
            Some("child.example.com")
        );
        assert!(zone.is_authoritative("notchild.example.com"));
    }

    #[test]
    fn test_soa_rules() {
        assert_eq!(
            Zone::new("example.com", vec![]),
            Err(ZoneError::MissingSoa("example.com".to_string()))
        );
        assert_eq!(
            Zone::new("example.com", vec![soa("example.com"), soa("example.com")]),
            Err(ZoneError::MultipleSoa("example.com".to_string()))
        );
        assert!(matches!(
            Zone::new("example.com", vec![soa("sub.example.com")]),
            Err(ZoneError::SoaNotAtApex { .. })
        ));
    }

    #[test]
    fn test_out_of_zone_records_are_rejected() {
        let result = Zone::new(
            "example.com",
            vec![
                soa("example.com"),
                DnsRecord::new_a_record("www.example.org", 60, Ipv4Addr::LOCALHOST),
            ],
        );
        assert!(matches!(result, Err(ZoneError::OutOfZone { .. })));
    }
}
