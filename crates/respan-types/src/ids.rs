//! Typed document identifiers.
//!
//! Documents are addressed by the numeric identifier the remote store assigns
//! them. Queues and listings order by this value, so it wraps a `u64` rather
//! than an opaque UUID.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A document identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(u64);

impl DocumentId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Key form used in the whole-store JSON object.
    pub fn to_key(self) -> String {
        self.0.to_string()
    }

    /// Parse the key form produced by [`DocumentId::to_key`].
    pub fn from_key(key: &str) -> Option<Self> {
        key.parse().ok()
    }
}

impl From<u64> for DocumentId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<DocumentId> for u64 {
    fn from(id: DocumentId) -> u64 {
        id.0
    }
}

impl FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_roundtrip() {
        let id = DocumentId::new(42);
        assert_eq!(DocumentId::from_key(&id.to_key()), Some(id));
        assert!(DocumentId::from_key("not-a-number").is_none());
    }

    #[test]
    fn test_parse_accepts_hash_prefix() {
        assert_eq!("#17".parse::<DocumentId>().unwrap(), DocumentId::new(17));
        assert_eq!(" 17 ".parse::<DocumentId>().unwrap(), DocumentId::new(17));
    }

    #[test]
    fn test_ordering_is_numeric() {
        let mut ids = vec![DocumentId::new(10), DocumentId::new(2), DocumentId::new(33)];
        ids.sort();
        assert_eq!(ids, vec![DocumentId::new(2), DocumentId::new(10), DocumentId::new(33)]);
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&DocumentId::new(7)).unwrap();
        assert_eq!(json, "7");
        let parsed: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, DocumentId::new(7));
    }
}
