//! Shared test utilities for quay integration tests.
//!
//! Available behind the `test-util` feature or in `#[cfg(test)]` within
//! quay-net. Provides a one-call hub fixture and a thin WebSocket client
//! with deadline-guarded receive helpers.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use quay_files::FileStore;
use quay_protocol::envelope::{decode_envelope, encode_envelope, Envelope};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::hub::{self, HubConfig, HubHandle};
use crate::listener::Listener;

/// Default timeout for expected messages in seconds.
pub const RECV_TIMEOUT_SECS: u64 = 5;

/// How long [`TestClient::expect_silence`] listens before declaring quiet.
pub const SILENCE_WINDOW_MS: u64 = 300;

/// Initialise a tracing subscriber for tests.
///
/// Respects the `RUST_LOG` environment variable, defaults to `debug`.
/// Safe to call multiple times — subsequent calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A hub bound to an ephemeral port with a temp-dir file store.
pub struct TestHub {
    pub addr: SocketAddr,
    pub hub: HubHandle,
    listener: Listener,
    store_dir: TempDir,
}

impl TestHub {
    /// The on-disk store root, for asserting side effects directly.
    pub fn store_path(&self) -> &Path {
        self.store_dir.path()
    }

    pub fn close(&self) {
        self.listener.close();
    }
}

/// Spawn a hub with default config on `127.0.0.1:0`.
pub async fn spawn_hub() -> TestHub {
    spawn_hub_with_config(HubConfig::default()).await
}

/// Spawn a hub with explicit config on `127.0.0.1:0`.
pub async fn spawn_hub_with_config(config: HubConfig) -> TestHub {
    let store_dir = TempDir::new().expect("temp store dir creation failed");
    let store =
        FileStore::new(store_dir.path().to_path_buf()).expect("test store creation failed");
    let hub = hub::spawn(store, config);
    let listener = Listener::bind("127.0.0.1:0".parse().unwrap(), hub.clone())
        .await
        .expect("test listener bind failed");

    TestHub {
        addr: listener.local_addr(),
        hub,
        listener,
        store_dir,
    }
}

/// A WebSocket client speaking the hub's envelope protocol.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let (ws, _) = connect_async(format!("ws://{addr}"))
            .await
            .expect("client connect failed");
        Self { ws }
    }

    pub async fn send(&mut self, envelope: &Envelope) {
        let text = encode_envelope(envelope).expect("envelope encode failed");
        self.send_raw(&text).await;
    }

    /// Send an arbitrary text frame, valid JSON or not.
    pub async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string()))
            .await
            .expect("client send failed");
    }

    /// Receive the next envelope, panicking after [`RECV_TIMEOUT_SECS`].
    pub async fn recv(&mut self) -> Envelope {
        let deadline = Duration::from_secs(RECV_TIMEOUT_SECS);
        loop {
            let frame = tokio::time::timeout(deadline, self.ws.next())
                .await
                .expect("timed out waiting for a message")
                .expect("connection closed while waiting for a message")
                .expect("websocket read error");
            match frame {
                Message::Text(text) => {
                    return decode_envelope(&text).expect("hub sent undecodable envelope")
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                other => panic!("unexpected non-text frame: {other:?}"),
            }
        }
    }

    /// Receive envelopes until one matches `want`, skipping the rest.
    ///
    /// Panics if the overall deadline passes first.
    pub async fn recv_matching(&mut self, want: impl Fn(&Envelope) -> bool) -> Envelope {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(RECV_TIMEOUT_SECS);
        loop {
            if tokio::time::Instant::now() > deadline {
                panic!("timed out waiting for a matching envelope");
            }
            let envelope = self.recv().await;
            if want(&envelope) {
                return envelope;
            }
        }
    }

    /// Register and consume the resulting `peer-list` + `file-list` pair.
    ///
    /// Returns the peer list the hub broadcast. Only safe when no other
    /// client is acting concurrently.
    pub async fn register(&mut self, peer_id: &str) -> Vec<String> {
        self.send(&Envelope::Register {
            peer_id: peer_id.to_string(),
        })
        .await;
        let peers = match self.recv().await {
            Envelope::PeerList { peers } => peers,
            other => panic!("expected peer-list after register, got {other:?}"),
        };
        match self.recv().await {
            Envelope::FileList { .. } => {}
            other => panic!("expected file-list after register, got {other:?}"),
        }
        peers
    }

    /// Assert that no envelope arrives within [`SILENCE_WINDOW_MS`].
    pub async fn expect_silence(&mut self) {
        match tokio::time::timeout(Duration::from_millis(SILENCE_WINDOW_MS), self.ws.next()).await
        {
            Err(_) => {}
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => {}
            Ok(frame) => panic!("expected silence, got {frame:?}"),
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

/// Sorted copy of a peer list for order-insensitive comparison.
pub fn sorted(mut peers: Vec<String>) -> Vec<String> {
    peers.sort();
    peers
}
