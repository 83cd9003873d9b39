//! The hub event loop: single owner of the registry, the connection
//! sender map, and the file store handle.
//!
//! Connection tasks never touch hub state directly — they send
//! [`HubEvent`]s and the loop processes each one to completion before the
//! next, which preserves the protocol's serialization guarantees without
//! locks.

use std::collections::HashMap;

use quay_files::FileStore;
use quay_protocol::envelope::Envelope;
use tokio::sync::{mpsc, watch};

use crate::connection::{ConnId, ConnectionHandle};
use crate::fanout;
use crate::registry::Registry;
use crate::router;

/// Default cap on decoded upload size: 64 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 64 * 1024 * 1024;

/// Tunable hub behavior.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum decoded size accepted for a `file-upload`, in bytes.
    pub max_file_size: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// Events delivered to the hub loop by connection tasks.
#[derive(Debug)]
pub enum HubEvent {
    /// A new connection finished its handshake.
    Connected { handle: ConnectionHandle },
    /// One inbound text frame from a connection.
    Inbound { conn_id: ConnId, text: String },
    /// The connection's socket closed, for any reason.
    Disconnected { conn_id: ConnId },
}

/// Cloneable handle for feeding events to the hub and shutting it down.
#[derive(Debug, Clone)]
pub struct HubHandle {
    event_tx: mpsc::UnboundedSender<HubEvent>,
    shutdown_tx: watch::Sender<bool>,
}

impl HubHandle {
    /// Deliver an event to the hub loop. Silently dropped after shutdown.
    pub(crate) fn send_event(&self, event: HubEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("hub loop gone, dropping event");
        }
    }

    /// Signal the hub loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// All state the router dispatches against.
pub(crate) struct HubState {
    pub(crate) registry: Registry,
    pub(crate) connections: HashMap<ConnId, mpsc::UnboundedSender<String>>,
    pub(crate) store: FileStore,
    pub(crate) max_file_size: u64,
}

/// Spawn the hub loop and return its handle.
pub fn spawn(store: FileStore, config: HubConfig) -> HubHandle {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = HubState {
        registry: Registry::new(),
        connections: HashMap::new(),
        store,
        max_file_size: config.max_file_size,
    };

    tokio::spawn(event_loop(state, event_rx, shutdown_rx));

    HubHandle {
        event_tx,
        shutdown_tx,
    }
}

async fn event_loop(
    mut state: HubState,
    mut event_rx: mpsc::UnboundedReceiver<HubEvent>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tracing::debug!("hub event loop started");

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(event) => handle_event(&mut state, event).await,
                    None => break,
                }
            }

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("hub event loop shutting down");
                    break;
                }
            }
        }
    }

    // Dropping the senders closes every writer task.
    state.connections.clear();
}

async fn handle_event(state: &mut HubState, event: HubEvent) {
    match event {
        HubEvent::Connected { handle } => {
            tracing::debug!(conn_id = %handle.id, "connection joined hub");
            state.connections.insert(handle.id, handle.outbound);
        }

        HubEvent::Inbound { conn_id, text } => {
            router::dispatch(state, conn_id, &text).await;
        }

        HubEvent::Disconnected { conn_id } => {
            state.connections.remove(&conn_id);
            // Registry cleanup is driven solely by this close event; the
            // peer list is re-broadcast so clients drop the departed peer.
            if let Some(peer) = state.registry.unregister(conn_id) {
                tracing::info!(peer = %peer, %conn_id, "peer disconnected");
                let peers = state
                    .registry
                    .peers()
                    .iter()
                    .map(|p| p.to_string())
                    .collect();
                fanout::broadcast(
                    &state.registry,
                    &state.connections,
                    &Envelope::PeerList { peers },
                );
            } else {
                tracing::debug!(%conn_id, "unregistered connection closed");
            }
        }
    }
}
