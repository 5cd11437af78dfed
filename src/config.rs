use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::dns_name::{is_subdomain_of, normalize_name};
use crate::dns_question_and_answer::{DnsRecord, RecordClass, RecordType};
use crate::error::ConfigError;
use crate::zone::Zone;

/// A zone described in TOML.
///
/// ```toml
/// name = "example.com"
///
/// [[records]]
/// name = "@"
/// type = "SOA"
/// data = "ns1.example.com. hostmaster.example.com. 1 7200 3600 1209600 300"
///
/// [[records]]
/// name = "mail"
/// type = "MX"
/// ttl = 300
/// priority = 10
/// data = "mx.example.com"
/// ```
///
/// Owner names are `@` for the apex, names already under the zone, or
/// relative names that get the zone name appended.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZoneFile {
    pub name: String,
    #[serde(default)]
    pub records: Vec<RecordEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    pub data: String,
    pub priority: Option<u16>,
    pub weight: Option<u16>,
    pub port: Option<u16>,
}

fn default_class() -> String {
    "IN".to_string()
}

fn default_ttl() -> u32 {
    3600
}

impl ZoneFile {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Reads and validates a zone file.
    pub fn load(path: &Path) -> Result<Zone, ConfigError> {
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let zone = Self::from_toml(&input)?.into_zone()?;
        info!(
            zone = zone.name(),
            records = zone.records().len(),
            path = %path.display(),
            "zone loaded"
        );
        Ok(zone)
    }

    /// Turns the entries into records, checks each one encodes, and builds
    /// the zone.
    pub fn into_zone(self) -> Result<Zone, ConfigError> {
        let origin = normalize_name(&self.name);

        let records = self
            .records
            .into_iter()
            .enumerate()
            .map(|(index, entry)| entry.into_record(index, &origin))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Zone::new(&origin, records)?)
    }
}

impl RecordEntry {
    fn into_record(self, index: usize, origin: &str) -> Result<DnsRecord, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidRecord {
            index,
            name: self.name.clone(),
            message,
        };

        let rtype: RecordType = self.rtype.parse().map_err(invalid)?;
        let rclass: RecordClass = self.class.parse().map_err(invalid)?;
        let owner = qualify(&self.name, origin);

        let record = DnsRecord {
            priority: self.priority,
            weight: self.weight,
            port: self.port,
            ..DnsRecord::new(&owner, rtype, rclass, self.ttl, &self.data)
        };

        record.to_bytes().map_err(|source| ConfigError::InvalidRdata {
            index,
            name: self.name.clone(),
            source,
        })?;

        Ok(record)
    }
}

fn qualify(name: &str, origin: &str) -> String {
    if name == "@" {
        return origin.to_string();
    }
    if name.ends_with('.') {
        return normalize_name(name);
    }
    let name = normalize_name(name);
    if is_subdomain_of(&name, origin) {
        name
    } else {
        format!("{}.{}", name, origin)
    }
}
