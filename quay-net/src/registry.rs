//! The connection registry: the authoritative identifier → connection map.
//!
//! Owned exclusively by the hub event loop; all mutation goes through the
//! operations here, which is what keeps the uniqueness invariant
//! enforceable. Nothing is reclaimed from silently-dead connections —
//! cleanup happens only on the connection's close event.

use std::collections::HashMap;

use quay_protocol::types::PeerId;
use thiserror::Error;

use crate::connection::ConnId;

/// Registration failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegisterError {
    #[error("peer ID already registered: {0}")]
    IdentifierTaken(PeerId),
}

/// Maps registered peer identifiers to live connections.
#[derive(Debug, Default)]
pub struct Registry {
    peers: HashMap<PeerId, ConnId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new identifier → connection mapping.
    ///
    /// Fails without touching the existing mapping if the identifier is
    /// already held by a live connection.
    pub fn register(&mut self, peer: PeerId, conn: ConnId) -> Result<(), RegisterError> {
        if self.peers.contains_key(&peer) {
            return Err(RegisterError::IdentifierTaken(peer));
        }
        self.peers.insert(peer, conn);
        Ok(())
    }

    /// Remove whatever identifier this connection holds, by reverse lookup.
    ///
    /// Returns `None` for connections that never completed registration.
    pub fn unregister(&mut self, conn: ConnId) -> Option<PeerId> {
        let peer = self
            .peers
            .iter()
            .find_map(|(peer, &c)| (c == conn).then(|| peer.clone()))?;
        self.peers.remove(&peer);
        Some(peer)
    }

    /// The identifier currently held by a connection, if any.
    pub fn identifier_for(&self, conn: ConnId) -> Option<&PeerId> {
        self.peers
            .iter()
            .find_map(|(peer, &c)| (c == conn).then_some(peer))
    }

    /// The connection holding an identifier, if any.
    pub fn get(&self, peer: &PeerId) -> Option<ConnId> {
        self.peers.get(peer).copied()
    }

    /// Snapshot of all registered identifiers. Iteration order unspecified.
    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.keys().cloned().collect()
    }

    /// Iterate over (identifier, connection) pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&PeerId, ConnId)> {
        self.peers.iter().map(|(peer, &conn)| (peer, conn))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
