//! Upload access policy
//!
//! A flat ban list loaded once at startup. Entries match on the exact IP
//! string after normalizing IPv4-mapped IPv6 notation, so `::ffff:1.2.3.4`
//! and `1.2.3.4` refer to the same client. The list is immutable for the
//! process lifetime.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// One configured ban: an IP and an optional operator-facing reason.
#[derive(Debug, Clone, Deserialize)]
pub struct BanEntry {
    pub ip: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Outcome of a policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied { reason: String },
}

/// Immutable ban list keyed by normalized IP.
#[derive(Debug, Clone, Default)]
pub struct BanList {
    entries: HashMap<String, String>,
}

/// Strip the IPv4-mapped IPv6 prefix so proxied and direct clients compare
/// equal.
pub fn normalize_ip(ip: &str) -> &str {
    ip.strip_prefix("::ffff:").unwrap_or(ip)
}

impl BanList {
    pub fn from_entries(entries: Vec<BanEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| {
                (
                    normalize_ip(&e.ip).to_string(),
                    e.reason.unwrap_or_default(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Load the ban list from a JSON array file. A missing file is an empty
    /// list; a malformed file is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No ban list file, allowing all IPs");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<BanEntry> = serde_json::from_str(&raw)?;
        tracing::info!(path = %path.display(), count = entries.len(), "Loaded ban list");
        Ok(Self::from_entries(entries))
    }

    pub fn check(&self, ip: &str) -> Verdict {
        match self.entries.get(normalize_ip(ip)) {
            Some(reason) => Verdict::Denied {
                reason: reason.clone(),
            },
            None => Verdict::Allowed,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banlist() -> BanList {
        BanList::from_entries(vec![
            BanEntry {
                ip: "10.0.0.7".to_string(),
                reason: Some("spam".to_string()),
            },
            BanEntry {
                ip: "192.168.1.20".to_string(),
                reason: None,
            },
        ])
    }

    #[test]
    fn unlisted_ip_is_allowed() {
        assert_eq!(banlist().check("10.0.0.8"), Verdict::Allowed);
    }

    #[test]
    fn listed_ip_is_denied_with_reason() {
        assert_eq!(
            banlist().check("10.0.0.7"),
            Verdict::Denied {
                reason: "spam".to_string()
            }
        );
    }

    #[test]
    fn missing_reason_defaults_to_empty() {
        assert_eq!(
            banlist().check("192.168.1.20"),
            Verdict::Denied {
                reason: String::new()
            }
        );
    }

    #[test]
    fn ipv4_mapped_ipv6_matches_plain_entry() {
        assert_eq!(
            banlist().check("::ffff:10.0.0.7"),
            Verdict::Denied {
                reason: "spam".to_string()
            }
        );
    }

    #[test]
    fn mapped_entry_matches_plain_client() {
        let list = BanList::from_entries(vec![BanEntry {
            ip: "::ffff:172.16.0.1".to_string(),
            reason: None,
        }]);
        assert!(matches!(list.check("172.16.0.1"), Verdict::Denied { .. }));
    }

    #[test]
    fn missing_file_loads_empty() {
        let list = BanList::load(Path::new("/nonexistent/banlist.json")).unwrap();
        assert!(list.is_empty());
    }
}
