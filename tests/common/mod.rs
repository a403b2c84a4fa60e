#![allow(dead_code)]

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use oocsi_gateway::events::audit::EventLog;
use oocsi_gateway::network::{
    bind_listener, serve, ClientDirectory, Payload, ServerContext, SessionSettings,
};
use oocsi_gateway::protocol::BasicProtocol;

pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedConnection {
    pub token: String,
    pub protocol: String,
    pub event: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub sender: String,
    pub recipient: String,
    pub data: Payload,
}

/// Records audit calls instead of forwarding them to the global dispatcher.
#[derive(Default)]
pub struct MemoryEventLog {
    pub connections: Mutex<Vec<LoggedConnection>>,
    pub events: Mutex<Vec<LoggedEvent>>,
}

impl EventLog for MemoryEventLog {
    fn log_connection(&self, token: &str, protocol: &str, event: &str, _time: SystemTime) {
        self.connections.lock().push(LoggedConnection {
            token: token.into(),
            protocol: protocol.into(),
            event: event.into(),
        });
    }

    fn log_event(&self, sender: &str, recipient: &str, data: &Payload, _time: SystemTime) {
        self.events.lock().push(LoggedEvent {
            sender: sender.into(),
            recipient: recipient.into(),
            data: data.clone(),
        });
    }
}

impl MemoryEventLog {
    pub fn connection_count(&self, token: &str, event: &str) -> usize {
        self.connections
            .lock()
            .iter()
            .filter(|c| c.token == token && c.event == event)
            .count()
    }
}

pub struct Gateway {
    pub addr: SocketAddr,
    pub router: Arc<BasicProtocol>,
    pub log: Arc<MemoryEventLog>,
}

pub fn quiet_settings() -> SessionSettings {
    SessionSettings {
        allow_console: false,
        ..Default::default()
    }
}

/// Serve a gateway on an ephemeral loopback port.
pub async fn start_gateway(settings: SessionSettings) -> Gateway {
    let listener = bind_listener("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let router = Arc::new(BasicProtocol::new(ClientDirectory::new()).with_console(false));
    let log = Arc::new(MemoryEventLog::default());
    let ctx = ServerContext {
        directory: router.clone(),
        router: router.clone(),
        event_log: log.clone(),
        settings,
    };
    tokio::spawn(serve(listener, ctx));
    Gateway { addr, router, log }
}

pub struct Peer {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Peer {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer,
        }
    }

    /// Connect and send the handshake line.
    pub async fn handshake(addr: SocketAddr, first_line: &str) -> Self {
        let mut peer = Self::connect(addr).await;
        peer.send(first_line).await;
        peer
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("write");
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write");
    }

    /// Next line without its newline; `None` at EOF.
    pub async fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = tokio::time::timeout(IO_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap_or(0);
        if n == 0 {
            return None;
        }
        Some(line.trim_end_matches('\n').to_string())
    }

    pub async fn expect_line(&mut self) -> String {
        self.recv().await.expect("connection closed unexpectedly")
    }

    /// Round-trip a ping so every earlier command has been processed.
    pub async fn sync(&mut self) {
        self.send("ping").await;
        assert_eq!(self.expect_line().await, "pong");
    }
}

/// Poll until `check` holds or the timeout elapses.
pub async fn wait_for(check: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + IO_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Poll the directory until `token` is (or is no longer) registered.
pub async fn wait_registered(router: &BasicProtocol, token: &str, registered: bool) -> bool {
    let deadline = tokio::time::Instant::now() + IO_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if router.directory().contains(token).await == registered {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
