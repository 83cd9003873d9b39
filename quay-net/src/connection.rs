//! Per-connection plumbing: identifiers, outbound handles, and the
//! reader/writer task pair that bridges one WebSocket to the hub loop.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::hub::{HubEvent, HubHandle};

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one live client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl ConnId {
    /// Allocate a process-unique connection id.
    pub fn next() -> Self {
        Self(NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound side of a connection as the hub sees it: an id plus a channel
/// whose receiver is drained into the socket by the writer task.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: ConnId,
    pub outbound: mpsc::UnboundedSender<String>,
}

/// Serve one accepted TCP connection for its whole lifetime.
///
/// Performs the WebSocket handshake, announces the connection to the hub,
/// then forwards inbound text frames as [`HubEvent::Inbound`]. Always
/// emits [`HubEvent::Disconnected`] when the socket goes away, however it
/// goes away — that event is the hub's only cleanup trigger.
pub(crate) async fn serve_socket(
    stream: TcpStream,
    peer_addr: std::net::SocketAddr,
    hub: HubHandle,
) -> Result<()> {
    let ws = tokio_tungstenite::accept_async(stream)
        .await
        .with_context(|| format!("websocket handshake failed for {peer_addr}"))?;

    let conn_id = ConnId::next();
    tracing::debug!(%conn_id, %peer_addr, "client connected");

    let (mut sink, mut source) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    hub.send_event(HubEvent::Connected {
        handle: ConnectionHandle {
            id: conn_id,
            outbound: outbound_tx,
        },
    });

    // Writer: drain the hub-facing channel into the socket. Best effort;
    // a dead socket surfaces through the reader loop below.
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if let Err(e) = sink.send(Message::Text(text)).await {
                tracing::debug!(%conn_id, error = %e, "outbound send failed, stopping writer");
                break;
            }
        }
    });

    // Reader: this task. One envelope per text frame.
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                hub.send_event(HubEvent::Inbound { conn_id, text });
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(%conn_id, "ignoring binary frame, protocol is JSON text");
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong handled by tungstenite
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "read error, closing connection");
                break;
            }
        }
    }

    hub.send_event(HubEvent::Disconnected { conn_id });
    writer.abort();
    tracing::debug!(%conn_id, %peer_addr, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_ids_are_unique() {
        let a = ConnId::next();
        let b = ConnId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn conn_id_display_is_stable() {
        let id = ConnId(42);
        assert_eq!(id.to_string(), "conn-42");
    }
}
