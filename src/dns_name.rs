use std::collections::HashSet;

use crate::error::NameError;

/// Longest label allowed on the wire.
pub const MAX_LABEL_LENGTH: usize = 63;
/// Longest encoded name, counting length bytes and the terminator.
pub const MAX_NAME_LENGTH: usize = 255;
/// Most labels a name may carry.
pub const MAX_LABELS: usize = 127;

const POINTER_MASK: u8 = 0xC0;

/// Packets are at most 65535 bytes, so a valid chain can never take more
/// hops than this.
const MAX_POINTER_HOPS: usize = 0x3FFF;

/// Parse a domain name from DNS message format
/// Supports DNS name compression (pointers)
/// Returns the parsed domain name and the offset just past the name as it
/// appears at `offset` (past the first pointer, if one was followed)
pub fn parse_domain_name(bytes: &[u8], offset: usize) -> Result<(String, usize), NameError> {
    let mut labels: Vec<&str> = Vec::new();
    let mut position = offset;
    let mut resume_at: Option<usize> = None;
    let mut visited = HashSet::new();

    loop {
        let length = *bytes.get(position).ok_or(NameError::Truncated(position))?;

        match length & POINTER_MASK {
            POINTER_MASK => {
                let low = *bytes
                    .get(position + 1)
                    .ok_or(NameError::TruncatedPointer(position))?;
                let target = (usize::from(length & !POINTER_MASK) << 8) | usize::from(low);

                if target >= position {
                    return Err(NameError::ForwardPointer {
                        at: position,
                        target,
                    });
                }
                if target >= bytes.len() {
                    return Err(NameError::PointerOutOfBounds {
                        at: position,
                        target,
                    });
                }
                if !visited.insert(target) || visited.len() > MAX_POINTER_HOPS {
                    return Err(NameError::PointerLoop(target));
                }

                if resume_at.is_none() {
                    resume_at = Some(position + 2);
                }
                position = target;
                continue;
            }
            0x00 => {}
            reserved => return Err(NameError::ReservedLabelType(reserved)),
        }

        position += 1;
        if length == 0 {
            break;
        }

        let end = position + usize::from(length);
        if end > bytes.len() {
            return Err(NameError::LabelOverrun(position - 1));
        }

        let label =
            std::str::from_utf8(&bytes[position..end]).map_err(|_| NameError::InvalidUtf8)?;
        labels.push(label);
        if labels.len() > MAX_LABELS {
            return Err(NameError::TooManyLabels(MAX_LABELS));
        }
        position = end;
    }

    Ok((labels.join("."), resume_at.unwrap_or(position)))
}

/// Encode a domain name to DNS message format
/// Format: length-prefixed labels terminated with a null byte
/// Example: "example.com" -> [7]example[3]com[0]
///
/// Names are always written in full; no compression pointers are emitted.
pub fn encode_domain_name(name: &str) -> Result<Vec<u8>, NameError> {
    let name = name.strip_suffix('.').unwrap_or(name);
    if name.is_empty() {
        return Ok(vec![0]);
    }

    let mut encoded = Vec::with_capacity(name.len() + 2);
    let mut count = 0;

    for label in name.split('.') {
        if label.is_empty() {
            return Err(NameError::EmptyLabel(name.to_string()));
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(NameError::LabelTooLong(label.to_string()));
        }
        if label.contains('@') {
            return Err(NameError::InvalidCharacter(label.to_string()));
        }

        count += 1;
        if count > MAX_LABELS {
            return Err(NameError::TooManyLabels(MAX_LABELS));
        }

        encoded.push(label.len() as u8);
        encoded.extend_from_slice(label.as_bytes());
    }

    encoded.push(0);
    if encoded.len() > MAX_NAME_LENGTH {
        return Err(NameError::NameTooLong(name.to_string()));
    }

    Ok(encoded)
}

/// Lower-cases a name and drops one trailing dot, the form used for every
/// name comparison in this crate.
pub fn normalize_name(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}

/// Returns true if `name` is `ancestor` or lies underneath it.
/// Both arguments must already be normalized.
pub fn is_subdomain_of(name: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() || name == ancestor {
        return true;
    }
    name.strip_suffix(ancestor)
        .is_some_and(|prefix| prefix.ends_with('.'))
}
