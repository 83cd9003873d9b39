//! Core protocol types shared across all quay crates.

use serde::{Deserialize, Serialize};

/// A client's self-chosen unique name; the addressing unit for targeted
/// and broadcast messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Validate a raw identifier string.
    ///
    /// Returns `None` if the string is empty or whitespace-only. The
    /// identifier is otherwise kept exactly as the client sent it.
    pub fn new(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The `version` value carried by every [`FileRecord`].
///
/// Inert metadata: the hub performs no version tracking, the field is a
/// fixed placeholder kept for wire compatibility.
pub const FILE_VERSION: u32 = 1;

/// A shared file as reported in `file-list` envelopes.
///
/// Derived on demand by listing the store directory; no file entity
/// persists between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub version: u32,
}

impl FileRecord {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            version: FILE_VERSION,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_accepts_ordinary_names() {
        let id = PeerId::new("alice").unwrap();
        assert_eq!(id.as_str(), "alice");
        assert_eq!(id.to_string(), "alice");
    }

    #[test]
    fn peer_id_preserves_inner_whitespace_and_case() {
        let id = PeerId::new("Alice Smith").unwrap();
        assert_eq!(id.as_str(), "Alice Smith");
    }

    #[test]
    fn peer_id_rejects_empty() {
        assert!(PeerId::new("").is_none());
    }

    #[test]
    fn peer_id_rejects_whitespace_only() {
        assert!(PeerId::new("   ").is_none());
        assert!(PeerId::new("\t\n").is_none());
    }

    #[test]
    fn file_record_carries_fixed_version() {
        let record = FileRecord::new("report.pdf");
        assert_eq!(record.filename, "report.pdf");
        assert_eq!(record.version, FILE_VERSION);
    }
}
