mod common;

use common::{quiet_settings, start_gateway, wait_for, wait_registered, Peer};
use tokio::net::TcpListener;

use oocsi_gateway::codec::{decode_oocsi, encode_oocsi};
use oocsi_gateway::client::PushLine;
use oocsi_gateway::network::{Message, Payload, Value};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oocsi_client_receives_pushed_event() {
    let gw = start_gateway(quiet_settings()).await;
    let mut alice = Peer::handshake(gw.addr, "alice").await;
    assert_eq!(alice.expect_line().await, "welcome alice");

    let data: Payload = [("color", "red")].into_iter().collect();
    let delivered = gw
        .router
        .publish(Message::at_millis("bob", "alice", data.clone(), 1700000000000))
        .await;
    assert_eq!(delivered, 1);

    let expected = format!(
        "send alice {} 1700000000000 bob",
        encode_oocsi(&data).expect("encode")
    );
    assert_eq!(alice.expect_line().await, expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oocsi_peers_exchange_messages_through_the_router() {
    let gw = start_gateway(quiet_settings()).await;
    let mut alice = Peer::handshake(gw.addr, "alice").await;
    assert_eq!(alice.expect_line().await, "welcome alice");
    let mut bob = Peer::handshake(gw.addr, "bob").await;
    assert_eq!(bob.expect_line().await, "welcome bob");

    let mut data = Payload::new();
    data.insert("n", 7);
    let token = encode_oocsi(&data).expect("encode");
    bob.send(&format!("send alice {}", token)).await;

    let line = alice.expect_line().await;
    let push = PushLine::parse(&line).expect("push line");
    assert_eq!(push.recipient, "alice");
    assert_eq!(push.sender, "bob");
    assert_eq!(decode_oocsi(&push.payload).expect("decode"), data);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn json_client_gets_json_welcome_and_events() {
    let gw = start_gateway(quiet_settings()).await;
    let mut c1 = Peer::handshake(gw.addr, "c1(JSON)").await;
    assert_eq!(c1.expect_line().await, "{'message' : \"welcome c1\"}");

    let data: Payload = [("v", 1)].into_iter().collect();
    gw.router
        .publish(Message::at_millis("s", "c1", data, 1700000000000))
        .await;
    assert_eq!(
        c1.expect_line().await,
        r#"{"v":1,"timestamp":1700000000000,"sender":"s"}"#
    );

    // commands still use the shared command set
    c1.send(r#"sendjson c1 {"k":"v"}"#).await;
    let line = c1.expect_line().await;
    let parsed: serde_json::Value = serde_json::from_str(&line).expect("json line");
    assert_eq!(parsed["k"], "v");
    assert_eq!(parsed["sender"], "c1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pd_output_goes_to_side_channel_with_terminator() {
    let aux = TcpListener::bind("127.0.0.1:0").await.expect("aux bind");
    let mut settings = quiet_settings();
    settings.pd_aux_port = aux.local_addr().expect("aux addr").port();
    let gw = start_gateway(settings).await;

    let mut main = Peer::handshake(gw.addr, "patch1;").await;
    let (aux_stream, _) = tokio::time::timeout(common::IO_TIMEOUT, aux.accept())
        .await
        .expect("side-channel connect")
        .expect("accept");
    let mut side = Peer::from_stream(aux_stream);
    assert_eq!(side.expect_line().await, "welcome patch1;");

    main.send("ping;").await;
    assert_eq!(side.expect_line().await, "pong;");

    let data: Payload = [("a", "1"), ("b", "2")].into_iter().collect();
    gw.router
        .publish(Message::at_millis("s", "patch1", data, 1700000000000))
        .await;
    assert_eq!(
        side.expect_line().await,
        "patch1 a=1 b=2 timestamp=1700000000000 sender=s;"
    );

    // PD input is key=value text once framing is removed
    main.send("sendraw patch1 x=9;").await;
    let line = side.expect_line().await;
    assert!(line.starts_with("patch1 x=9 timestamp="), "{}", line);
    assert!(line.ends_with(" sender=patch1;"), "{}", line);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pd_session_survives_missing_side_channel() {
    // grab a free port, then close it so the side-channel connect is refused
    let port = {
        let spare = TcpListener::bind("127.0.0.1:0").await.expect("bind spare port");
        spare.local_addr().expect("addr").port()
    };
    let mut settings = quiet_settings();
    settings.pd_aux_port = port;
    let gw = start_gateway(settings).await;

    let mut main = Peer::handshake(gw.addr, "patch2;").await;
    assert!(wait_registered(&gw.router, "patch2", true).await);

    // output is dropped, input still processed
    main.send("subscribe room;").await;
    assert!(wait_for(|| gw.router.subscribers("room") == ["patch2"]).await);
    assert_eq!(gw.log.connection_count("patch2", "client connected"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connection_log_and_message_annotation() {
    let gw = start_gateway(quiet_settings()).await;
    let mut alice = Peer::handshake(gw.addr, "alice").await;
    assert_eq!(alice.expect_line().await, "welcome alice");
    let log = gw.log.clone();
    assert!(wait_for(|| log.connection_count("alice", "client connected") == 1).await);
    assert_eq!(log.connections.lock()[0].protocol, "OOCSI");

    let data: Payload = [("x", 1)].into_iter().collect();
    gw.router.publish(Message::new("bob", "alice", data)).await;
    alice.expect_line().await;

    let events = log.events.lock().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].sender, "bob");
    assert_eq!(events[0].recipient, "alice");
    assert_eq!(events[0].data.get("method"), Some(&Value::from("OOCSI")));
    assert_eq!(events[0].data.get("x"), Some(&Value::from(1)));

    drop(alice);
    assert!(wait_for(|| log.connection_count("alice", "client disconnected") == 1).await);
    assert!(wait_registered(&gw.router, "alice", false).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn quit_closes_and_unregisters() {
    let gw = start_gateway(quiet_settings()).await;
    let mut alice = Peer::handshake(gw.addr, "alice").await;
    assert_eq!(alice.expect_line().await, "welcome alice");
    alice.send("quit").await;
    assert_eq!(alice.recv().await, None);

    assert!(wait_registered(&gw.router, "alice", false).await);
    assert!(wait_for(|| gw.log.connection_count("alice", "client disconnected") == 1).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn peer_closing_before_handshake_leaves_no_trace() {
    let gw = start_gateway(quiet_settings()).await;
    let peer = Peer::connect(gw.addr).await;
    drop(peer);

    // a later client still gets served
    let mut alice = Peer::handshake(gw.addr, "alice").await;
    assert_eq!(alice.expect_line().await, "welcome alice");
    assert!(gw.log.connections.lock().iter().all(|c| c.token == "alice"));
}
