//! The typed message units exchanged between clients and the hub.
//!
//! Every envelope is one JSON text document tagged by a `type` field.
//! Binary file content never crosses the wire raw: it is carried as a
//! base64 string inside the envelope, encoded and decoded at the router
//! boundary via [`encode_content`] / [`decode_content`].

use data_encoding::BASE64;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::FileRecord;

/// A single message unit on the client connection, in either direction.
///
/// Field names are pinned to the wire format (`peerID`, `fileContent`);
/// tags are the kebab-case type strings from the protocol catalogue.
/// Unrecognized tags decode to [`Envelope::Unknown`] so the hub can
/// answer them instead of treating them as parse failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    /// Client claims an identifier. Must precede nothing in particular:
    /// the hub serves file and chat traffic to unregistered connections,
    /// but only registered peers receive broadcasts.
    Register {
        #[serde(rename = "peerID")]
        peer_id: String,
    },
    /// Broadcast snapshot of all registered identifiers.
    PeerList { peers: Vec<String> },
    /// Client asks for the current file directory listing.
    FileListRequest,
    /// Directory listing, one record per stored file.
    FileList { files: Vec<FileRecord> },
    /// Broadcast change signal with no payload; clients re-request the list.
    FileListUpdate,
    /// Client asks for a file's content.
    FileRequest { filename: String },
    /// Full file content, base64.
    FileResponse {
        filename: String,
        #[serde(rename = "fileContent")]
        file_content: String,
    },
    /// Client stores (or overwrites) a file, content base64.
    FileUpload {
        filename: String,
        #[serde(rename = "fileContent")]
        file_content: String,
    },
    /// Client asks for an inline preview of a stored file.
    FilePreview { filename: String },
    /// Preview payload. `content` is base64 for previewable formats and
    /// null otherwise, in which case `message` explains why.
    FilePreviewResponse {
        filename: String,
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Chat line, relayed verbatim to every registered peer.
    Chat { sender: String, content: String },
    /// Unicast failure report, human-readable.
    Error { message: String },
    /// Catch-all for tags the hub does not know. Never serialized.
    #[serde(other)]
    Unknown,
}

/// Errors produced by the envelope and content codecs.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid envelope JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid base64 content: {0}")]
    ContentEncoding(#[from] data_encoding::DecodeError),
}

/// Serialize an envelope to its JSON wire form.
pub fn encode_envelope(envelope: &Envelope) -> Result<String, EnvelopeError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Parse one inbound JSON document into an envelope.
pub fn decode_envelope(text: &str) -> Result<Envelope, EnvelopeError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode raw file bytes for transport inside an envelope.
pub fn encode_content(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode base64 file content back to the exact original bytes.
pub fn decode_content(content: &str) -> Result<Vec<u8>, EnvelopeError> {
    Ok(BASE64.decode(content.as_bytes())?)
}
