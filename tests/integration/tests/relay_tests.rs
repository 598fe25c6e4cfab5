//! Relay Integration Tests
//!
//! Every scenario runs against a real relay on a loopback socket, once per
//! transport.
//!
//! Run with: cargo test -p integration-tests --test relay_tests

use anyhow::Result;
use chat_common::TransportKind;
use chat_core::ConnectionId;
use integration_tests::{
    chat_line, joined_notice, left_notice, test_config, unique_name, TestClient, TestServer, WELCOME,
};

/// Expands one async scenario into a test per transport
macro_rules! for_each_transport {
    ($scenario:ident) => {
        mod $scenario {
            use super::*;

            #[tokio::test]
            async fn tcp() {
                super::$scenario(TransportKind::Tcp).await.unwrap();
            }

            #[tokio::test]
            async fn websocket() {
                super::$scenario(TransportKind::WebSocket).await.unwrap();
            }
        }
    };
}

// ============================================================================
// End-to-end
// ============================================================================

async fn end_to_end_scenario(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;

    let mut alice = server.join("alice").await?;
    let mut bob = server.join("bob").await?;
    alice.expect(&joined_notice("bob")).await?;
    let mut carol = server.join("carol").await?;
    alice.expect(&joined_notice("carol")).await?;
    bob.expect(&joined_notice("carol")).await?;

    alice.send("hello").await?;
    bob.expect(&chat_line("alice", "hello")).await?;
    carol.expect(&chat_line("alice", "hello")).await?;
    alice.expect_silence().await?;

    drop(carol);
    alice.expect(&left_notice("carol")).await?;
    bob.expect(&left_notice("carol")).await?;
    alice.expect_silence().await?;
    bob.expect_silence().await?;

    server.wait_for_members(&["alice", "bob"]).await
}
for_each_transport!(end_to_end_scenario);

// ============================================================================
// Join / leave visibility
// ============================================================================

async fn join_notice_precedes_first_message(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut alice = server.join("alice").await?;

    let mut bob = server.join("bob").await?;
    bob.send("first!").await?;

    alice.expect(&joined_notice("bob")).await?;
    alice.expect(&chat_line("bob", "first!")).await
}
for_each_transport!(join_notice_precedes_first_message);

async fn joining_client_gets_confirmation_not_notice(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let _alice = server.join("alice").await?;

    // join() already checked the welcome and the direct confirmation
    let mut bob = server.join("bob").await?;
    bob.expect_silence().await
}
for_each_transport!(joining_client_gets_confirmation_not_notice);

async fn exit_keyword_announces_leave(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut alice = server.join("alice").await?;
    let mut bob = server.join("bob").await?;
    alice.expect(&joined_notice("bob")).await?;

    bob.send("Exit").await?;
    bob.expect_closed().await?;

    alice.expect(&left_notice("bob")).await?;
    alice.expect_silence().await?;
    server.wait_for_members(&["alice"]).await
}
for_each_transport!(exit_keyword_announces_leave);

async fn polite_close_announces_leave(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut alice = server.join("alice").await?;
    let bob = server.join("bob").await?;
    alice.expect(&joined_notice("bob")).await?;

    bob.close().await?;

    alice.expect(&left_notice("bob")).await?;
    alice.expect_silence().await
}
for_each_transport!(polite_close_announces_leave);

async fn disconnect_before_identity_is_silent(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut alice = server.join("alice").await?;

    let mut lurker = server.connect().await?;
    lurker.expect(WELCOME).await?;
    drop(lurker);

    alice.expect_silence().await?;
    server.wait_for_members(&["alice"]).await
}
for_each_transport!(disconnect_before_identity_is_silent);

// ============================================================================
// Delivery
// ============================================================================

async fn sender_never_receives_own_messages(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut alice = server.join("alice").await?;
    let mut bob = server.join("bob").await?;
    alice.expect(&joined_notice("bob")).await?;

    for i in 0..5 {
        alice.send(&format!("msg {i}")).await?;
    }
    for i in 0..5 {
        bob.expect(&chat_line("alice", &format!("msg {i}"))).await?;
    }
    alice.expect_silence().await
}
for_each_transport!(sender_never_receives_own_messages);

async fn fan_out_survives_a_vanished_recipient(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut sender = server.join("sender").await?;
    let mut first = server.join("first").await?;
    sender.expect(&joined_notice("first")).await?;
    let gone = server.join("gone").await?;
    sender.expect(&joined_notice("gone")).await?;
    first.expect(&joined_notice("gone")).await?;
    let mut third = server.join("third").await?;
    sender.expect(&joined_notice("third")).await?;
    first.expect(&joined_notice("third")).await?;

    drop(gone);
    sender.send("still here?").await?;

    // The leave notice and the chat line may arrive in either order.
    for client in [&mut first, &mut third] {
        let mut seen = vec![client.recv().await?, client.recv().await?];
        seen.sort();
        let mut expected = vec![chat_line("sender", "still here?"), left_notice("gone")];
        expected.sort();
        assert_eq!(seen, expected);
    }

    server.wait_for_members(&["sender", "first", "third"]).await
}
for_each_transport!(fan_out_survives_a_vanished_recipient);

async fn empty_and_unicode_messages_are_relayed(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut alice = server.join("alice").await?;
    let mut bob = server.join("bøb 🚀").await?;
    alice.expect(&joined_notice("bøb 🚀")).await?;

    bob.send("").await?;
    bob.send("exit now").await?;
    bob.send("héllo").await?;

    alice.expect(&chat_line("bøb 🚀", "")).await?;
    alice.expect(&chat_line("bøb 🚀", "exit now")).await?;
    alice.expect(&chat_line("bøb 🚀", "héllo")).await
}
for_each_transport!(empty_and_unicode_messages_are_relayed);

async fn many_clients_see_everyone_else(transport: TransportKind) -> Result<()> {
    const CLIENTS: usize = 8;
    let server = TestServer::start(transport).await?;

    let mut clients: Vec<TestClient> = Vec::new();
    let mut names = Vec::new();
    for _ in 0..CLIENTS {
        let name = unique_name("user");
        let client = server.join(&name).await?;
        for earlier in &mut clients {
            earlier.expect(&joined_notice(&name)).await?;
        }
        clients.push(client);
        names.push(name);
    }

    for (client, name) in clients.iter_mut().zip(&names) {
        client.send(&format!("hi from {name}")).await?;
    }

    for (i, client) in clients.iter_mut().enumerate() {
        let mut received = Vec::new();
        for _ in 0..CLIENTS - 1 {
            received.push(client.recv().await?);
        }
        received.sort();

        let mut expected: Vec<String> = names
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, name)| chat_line(name, &format!("hi from {name}")))
            .collect();
        expected.sort();

        assert_eq!(received, expected);
    }

    Ok(())
}
for_each_transport!(many_clients_see_everyone_else);

// ============================================================================
// Registry
// ============================================================================

async fn registry_matches_joined_clients(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    assert!(server.members().is_empty());

    let mut alice = server.join("alice").await?;
    let bob = server.join("bob").await?;
    alice.expect(&joined_notice("bob")).await?;
    let _pending = server.connect().await?;

    server.wait_for_members(&["alice", "bob"]).await?;

    drop(bob);
    alice.expect(&left_notice("bob")).await?;
    server.wait_for_members(&["alice"]).await?;

    alice.send("exit").await?;
    server.wait_for_members(&[]).await
}
for_each_transport!(registry_matches_joined_clients);

async fn repeated_unregister_is_harmless(transport: TransportKind) -> Result<()> {
    let server = TestServer::start(transport).await?;
    let mut alice = server.join("alice").await?;
    let mut bob = server.join("bob").await?;
    alice.expect(&joined_notice("bob")).await?;

    let bob_id = server
        .state()
        .registry()
        .snapshot()
        .into_iter()
        .find(|m| m.identity.as_str() == "bob")
        .map(|m| m.id())
        .expect("bob is registered");

    bob.send("exit").await?;
    alice.expect(&left_notice("bob")).await?;
    server.wait_for_members(&["alice"]).await?;

    // The session already unregistered bob; a racing second removal is a no-op.
    assert!(server.state().registry().unregister(bob_id).is_none());
    assert!(server.state().registry().unregister(ConnectionId::new(u64::MAX)).is_none());
    server.wait_for_members(&["alice"]).await?;

    let mut carol = server.join("carol").await?;
    alice.expect(&joined_notice("carol")).await?;
    alice.send("still works").await?;
    carol.expect(&chat_line("alice", "still works")).await
}
for_each_transport!(repeated_unregister_is_harmless);

// ============================================================================
// Configuration
// ============================================================================

async fn timestamped_lines(transport: TransportKind) -> Result<()> {
    let mut config = test_config(transport);
    config.session.timestamps = true;
    let server = TestServer::start_with_config(config).await?;

    let mut alice = server.join_timestamped("alice").await?;
    let mut bob = server.join_timestamped("bob").await?;

    let notice = alice.recv().await?;
    assert!(notice.starts_with("bob joined the chat at "), "{notice}");
    assert!(notice.ends_with('!'), "{notice}");

    bob.send("hi").await?;
    let line = alice.recv().await?;
    assert!(line.starts_with("bob at "), "{line}");
    assert!(line.ends_with(": hi"), "{line}");
    Ok(())
}
for_each_transport!(timestamped_lines);

async fn oversized_frame_closes_sender(transport: TransportKind) -> Result<()> {
    let mut config = test_config(transport);
    config.session.max_frame_len = 16;
    let server = TestServer::start_with_config(config).await?;

    let mut alice = server.join("alice").await?;
    let mut bob = server.join("bob").await?;
    alice.expect(&joined_notice("bob")).await?;

    bob.send("short").await?;
    alice.expect(&chat_line("bob", "short")).await?;

    bob.send(&"x".repeat(64)).await?;
    bob.expect_closed().await?;

    alice.expect(&left_notice("bob")).await?;
    server.wait_for_members(&["alice"]).await
}
for_each_transport!(oversized_frame_closes_sender);

#[tokio::test]
async fn bind_failure_is_reported() {
    let first = TestServer::start(TransportKind::Tcp).await.unwrap();

    let mut config = test_config(TransportKind::Tcp);
    config.server.port = first.addr.port();
    let err = TestServer::start_with_config(config).await.err().unwrap();

    assert!(err.to_string().starts_with("Failed to bind to"), "{err}");
}
