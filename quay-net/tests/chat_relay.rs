//! Integration tests for chat relay and bad-message isolation.

use quay_net::testing::{init_test_tracing, spawn_hub, TestClient};
use quay_protocol::envelope::Envelope;

fn chat(sender: &str, content: &str) -> Envelope {
    Envelope::Chat {
        sender: sender.to_string(),
        content: content.to_string(),
    }
}

#[tokio::test]
async fn chat_reaches_all_registered_peers_including_sender() {
    init_test_tracing();
    let hub = spawn_hub().await;

    let mut alice = TestClient::connect(hub.addr).await;
    alice.register("alice").await;
    let mut bob = TestClient::connect(hub.addr).await;
    bob.register("bob").await;
    alice
        .recv_matching(|e| matches!(e, Envelope::PeerList { .. }))
        .await;

    alice.send(&chat("alice", "hi")).await;

    assert_eq!(alice.recv().await, chat("alice", "hi"));
    assert_eq!(bob.recv().await, chat("alice", "hi"));

    hub.close();
}

#[tokio::test]
async fn chat_from_unregistered_connection_relayed_to_registered_peers() {
    init_test_tracing();
    let hub = spawn_hub().await;

    let mut alice = TestClient::connect(hub.addr).await;
    alice.register("alice").await;

    // The hub relays for any connection, but only registered peers are
    // broadcast targets — the anonymous sender hears nothing back.
    let mut anon = TestClient::connect(hub.addr).await;
    anon.send(&chat("mystery", "boo")).await;

    assert_eq!(alice.recv().await, chat("mystery", "boo"));
    anon.expect_silence().await;

    hub.close();
}

#[tokio::test]
async fn unknown_type_yields_single_error_to_sender_only() {
    init_test_tracing();
    let hub = spawn_hub().await;

    let mut alice = TestClient::connect(hub.addr).await;
    alice.register("alice").await;
    let mut bob = TestClient::connect(hub.addr).await;
    bob.register("bob").await;
    alice
        .recv_matching(|e| matches!(e, Envelope::PeerList { .. }))
        .await;

    bob.send_raw(r#"{"type":"teleport","to":"mars"}"#).await;

    match bob.recv().await {
        Envelope::Error { message } => assert_eq!(message, "Unknown request type"),
        other => panic!("expected error, got {other:?}"),
    }
    alice.expect_silence().await;

    // Registry and store are untouched: normal traffic still flows.
    bob.send(&chat("bob", "still here")).await;
    assert_eq!(alice.recv().await, chat("bob", "still here"));
    assert_eq!(bob.recv().await, chat("bob", "still here"));

    hub.close();
}

#[tokio::test]
async fn hub_to_client_types_are_unknown_requests() {
    init_test_tracing();
    let hub = spawn_hub().await;

    let mut client = TestClient::connect(hub.addr).await;
    client
        .send(&Envelope::PeerList {
            peers: vec!["fake".to_string()],
        })
        .await;

    match client.recv().await {
        Envelope::Error { message } => assert_eq!(message, "Unknown request type"),
        other => panic!("expected error, got {other:?}"),
    }

    hub.close();
}

#[tokio::test]
async fn malformed_frame_does_not_kill_the_hub() {
    init_test_tracing();
    let hub = spawn_hub().await;

    let mut alice = TestClient::connect(hub.addr).await;
    alice.register("alice").await;

    alice.send_raw("{this is not json").await;
    match alice.recv().await {
        Envelope::Error { message } => assert_eq!(message, "malformed message"),
        other => panic!("expected error, got {other:?}"),
    }

    // Same connection, same hub, still serving.
    alice.send(&chat("alice", "alive")).await;
    assert_eq!(alice.recv().await, chat("alice", "alive"));

    hub.close();
}
