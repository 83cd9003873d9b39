//! WebSocket listener: accepts client connections and hands each one to
//! the per-connection tasks.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::connection;
use crate::hub::HubHandle;

/// Accepts client connections on a bound TCP address.
pub struct Listener {
    local_addr: SocketAddr,
    hub: HubHandle,
    shutdown_tx: watch::Sender<bool>,
}

impl Listener {
    /// Bind the address and start accepting connections for `hub`.
    pub async fn bind(addr: SocketAddr, hub: HubHandle) -> Result<Self> {
        let tcp = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        let local_addr = tcp.local_addr().context("failed to read bound address")?;

        tracing::info!(%local_addr, "listening for client connections");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(accept_loop(tcp, hub.clone(), shutdown_rx));

        Ok(Self {
            local_addr,
            hub,
            shutdown_tx,
        })
    }

    /// The bound address (useful with an ephemeral port).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and shut the hub down.
    pub fn close(&self) {
        tracing::info!(addr = %self.local_addr, "listener closing");
        let _ = self.shutdown_tx.send(true);
        self.hub.shutdown();
    }
}

async fn accept_loop(tcp: TcpListener, hub: HubHandle, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = tcp.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        tracing::debug!(%peer_addr, "incoming connection");
                        let hub = hub.clone();
                        tokio::spawn(async move {
                            if let Err(e) = connection::serve_socket(stream, peer_addr, hub).await {
                                tracing::debug!(%peer_addr, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }

            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::debug!("accept loop stopping");
                    break;
                }
            }
        }
    }
}
