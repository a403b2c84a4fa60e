mod common;

use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

use common::MemoryEventLog;

use oocsi_gateway::codec::format_push_line;
use oocsi_gateway::network::{
    detect, Client, ClientDirectory, Dialect, ExclusiveWriter, Message, Payload, SessionState,
    SocketClient,
};

const GRACE: Duration = Duration::from_secs(2);

fn peer() -> std::net::SocketAddr {
    "127.0.0.1:9".parse().expect("addr")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_walks_every_state_once_and_ignores_late_sends() {
    let log = Arc::new(MemoryEventLog::default());
    let directory = ClientDirectory::new();
    let (local, mut remote) = tokio::io::duplex(64 * 1024);

    let client = Arc::new(SocketClient::new(peer(), log.clone(), false));
    assert_eq!(client.state(), SessionState::Connecting);

    let writer = ExclusiveWriter::spawn(Box::new(local), 8, peer(), false);
    assert!(client.classify(detect("alice"), writer));
    assert_eq!(client.state(), SessionState::Handshaking);
    assert_eq!(client.token(), "alice");
    assert_eq!(client.dialect(), Dialect::Oocsi);

    // token and dialect are write-once
    assert!(!client.classify(detect("mallory(JSON)"), ExclusiveWriter::detached()));
    assert_eq!(client.token(), "alice");
    assert_eq!(client.dialect(), Dialect::Oocsi);

    assert!(client.register(&directory).await);
    assert_eq!(client.state(), SessionState::Registered);
    assert!(directory.contains("alice").await);

    let data: Payload = [("n", 1)].into_iter().collect();
    let message = Message::at_millis("bob", "alice", data, 1700000000000);
    let expected = format_push_line(Dialect::Oocsi, &message).expect("push line");
    client.send(message).await;
    assert_eq!(log.events.lock().len(), 1);

    client.teardown(&directory, GRACE).await;
    assert_eq!(client.state(), SessionState::Closed);
    assert!(!directory.contains("alice").await);

    // second teardown and late sends change nothing
    client.teardown(&directory, GRACE).await;
    client
        .send(Message::new("bob", "alice", Payload::new()))
        .await;
    assert!(!client.send_line("late").await);

    assert_eq!(
        client.transitions(),
        [
            SessionState::Connecting,
            SessionState::Handshaking,
            SessionState::Registered,
            SessionState::Closing,
            SessionState::Closed,
        ]
    );
    assert_eq!(log.events.lock().len(), 1);
    assert_eq!(log.connection_count("alice", "client disconnected"), 1);

    let mut out = String::new();
    remote.read_to_string(&mut out).await.expect("read");
    assert_eq!(out, format!("{}\n", expected));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_session_closes_without_evicting_the_owner() {
    let log = Arc::new(MemoryEventLog::default());
    let directory = ClientDirectory::new();

    let owner = Arc::new(SocketClient::new(peer(), log.clone(), false));
    owner.classify(detect("dup"), ExclusiveWriter::detached());
    assert!(owner.register(&directory).await);

    let (local, mut remote) = tokio::io::duplex(1024);
    let late = Arc::new(SocketClient::new(peer(), log.clone(), false));
    late.classify(
        detect("dup"),
        ExclusiveWriter::spawn(Box::new(local), 4, peer(), false),
    );
    assert!(!late.register(&directory).await);
    assert_eq!(late.state(), SessionState::Handshaking);
    assert!(late.send_line(&Dialect::Oocsi.reject_line("dup")).await);

    late.teardown(&directory, GRACE).await;
    assert_eq!(
        late.transitions(),
        [
            SessionState::Connecting,
            SessionState::Handshaking,
            SessionState::Closing,
            SessionState::Closed,
        ]
    );
    assert!(directory.contains("dup").await);
    assert_eq!(owner.state(), SessionState::Registered);

    let mut out = String::new();
    remote.read_to_string(&mut out).await.expect("read");
    assert_eq!(out, "error (name already registered: dup)\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registration_requires_a_classified_session() {
    let log = Arc::new(MemoryEventLog::default());
    let directory = ClientDirectory::new();
    let client = Arc::new(SocketClient::new(peer(), log, false));
    assert!(!client.register(&directory).await);
    assert_eq!(client.state(), SessionState::Connecting);
    assert!(directory.is_empty().await);
}
