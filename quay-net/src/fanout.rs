//! Broadcast fan-out: one envelope to every registered connection.

use std::collections::HashMap;

use quay_protocol::envelope::{encode_envelope, Envelope};
use tokio::sync::mpsc;

use crate::connection::ConnId;
use crate::registry::Registry;

/// Send `envelope` to every connection currently in the registry.
///
/// The envelope is serialized once. Delivery is best-effort per
/// connection: a connection whose writer is gone is skipped with a debug
/// log and never fails the triggering request.
pub fn broadcast(
    registry: &Registry,
    connections: &HashMap<ConnId, mpsc::UnboundedSender<String>>,
    envelope: &Envelope,
) {
    let text = match encode_envelope(envelope) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode broadcast envelope");
            return;
        }
    };

    for (peer, conn_id) in registry.entries() {
        let Some(tx) = connections.get(&conn_id) else {
            tracing::debug!(peer = %peer, %conn_id, "registered peer has no live connection");
            continue;
        };
        if tx.send(text.clone()).is_err() {
            tracing::debug!(peer = %peer, %conn_id, "broadcast delivery failed, connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quay_protocol::types::PeerId;

    fn peer(name: &str) -> PeerId {
        PeerId::new(name).unwrap()
    }

    fn chat() -> Envelope {
        Envelope::Chat {
            sender: "alice".to_string(),
            content: "hi".to_string(),
        }
    }

    #[test]
    fn broadcast_reaches_every_registered_connection() {
        let mut registry = Registry::new();
        let mut connections = HashMap::new();
        let mut receivers = Vec::new();

        for name in ["alice", "bob", "carol"] {
            let conn = ConnId::next();
            let (tx, rx) = mpsc::unbounded_channel();
            registry.register(peer(name), conn).unwrap();
            connections.insert(conn, tx);
            receivers.push(rx);
        }

        broadcast(&registry, &connections, &chat());

        let expected = encode_envelope(&chat()).unwrap();
        for mut rx in receivers {
            assert_eq!(rx.try_recv().unwrap(), expected);
        }
    }

    #[test]
    fn unregistered_connections_are_not_included() {
        let mut registry = Registry::new();
        let mut connections = HashMap::new();

        let registered = ConnId::next();
        let (reg_tx, mut reg_rx) = mpsc::unbounded_channel();
        registry.register(peer("alice"), registered).unwrap();
        connections.insert(registered, reg_tx);

        // Connected but never registered.
        let anonymous = ConnId::next();
        let (anon_tx, mut anon_rx) = mpsc::unbounded_channel();
        connections.insert(anonymous, anon_tx);

        broadcast(&registry, &connections, &chat());

        assert!(reg_rx.try_recv().is_ok());
        assert!(anon_rx.try_recv().is_err());
    }

    #[test]
    fn one_dead_connection_does_not_block_the_rest() {
        let mut registry = Registry::new();
        let mut connections = HashMap::new();

        let dead = ConnId::next();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        drop(dead_rx);
        registry.register(peer("dead"), dead).unwrap();
        connections.insert(dead, dead_tx);

        let live = ConnId::next();
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        registry.register(peer("live"), live).unwrap();
        connections.insert(live, live_tx);

        broadcast(&registry, &connections, &chat());

        assert!(live_rx.try_recv().is_ok());
    }
}
