//! Shared types and wire formats for quay.

pub mod envelope;
pub mod types;

pub use envelope::{decode_content, decode_envelope, encode_content, encode_envelope, Envelope};
pub use types::{FileRecord, PeerId};
