mod common;

use common::{quiet_settings, start_gateway, wait_for, wait_registered, Peer};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_token_is_rejected_and_original_survives() {
    let gw = start_gateway(quiet_settings()).await;
    let mut first = Peer::handshake(gw.addr, "dup").await;
    assert_eq!(first.expect_line().await, "welcome dup");

    let mut second = Peer::handshake(gw.addr, "dup").await;
    assert_eq!(
        second.expect_line().await,
        "error (name already registered: dup)"
    );
    assert_eq!(second.recv().await, None);

    // the rejected session must not evict the original entry
    first.sync().await;
    assert!(gw.router.directory().contains("dup").await);
    assert_eq!(gw.log.connection_count("dup", "client connected"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_across_dialects_uses_the_newcomers_dialect() {
    let gw = start_gateway(quiet_settings()).await;
    let mut first = Peer::handshake(gw.addr, "shared").await;
    assert_eq!(first.expect_line().await, "welcome shared");

    let mut second = Peer::handshake(gw.addr, "shared(JSON)").await;
    assert_eq!(
        second.expect_line().await,
        "error (name already registered: shared)"
    );
    assert_eq!(second.recv().await, None);
    first.sync().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn token_is_free_again_after_disconnect() {
    let gw = start_gateway(quiet_settings()).await;
    let mut first = Peer::handshake(gw.addr, "reuse").await;
    assert_eq!(first.expect_line().await, "welcome reuse");
    drop(first);
    assert!(wait_registered(&gw.router, "reuse", false).await);

    let mut again = Peer::handshake(gw.addr, "reuse").await;
    assert_eq!(again.expect_line().await, "welcome reuse");
    assert!(wait_for(|| gw.log.connection_count("reuse", "client connected") == 2).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_token_is_rejected() {
    let gw = start_gateway(quiet_settings()).await;
    let mut peer = Peer::handshake(gw.addr, "").await;
    assert_eq!(
        peer.expect_line().await,
        "error (name already registered: )"
    );
    assert_eq!(peer.recv().await, None);
    assert!(gw.router.directory().is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_handshakes_register_exactly_one() {
    let gw = start_gateway(quiet_settings()).await;
    let mut handles = Vec::new();
    for _ in 0..8 {
        let addr = gw.addr;
        handles.push(tokio::spawn(async move {
            let mut peer = Peer::handshake(addr, "race").await;
            let line = peer.expect_line().await;
            (line, peer)
        }));
    }
    let mut welcomed = 0;
    let mut peers = Vec::new();
    for handle in handles {
        let (line, peer) = handle.await.expect("join");
        if line == "welcome race" {
            welcomed += 1;
        } else {
            assert_eq!(line, "error (name already registered: race)");
        }
        peers.push(peer);
    }
    assert_eq!(welcomed, 1);
    assert_eq!(gw.router.directory().list_tokens().await, ["race"]);
}
