// src/network/session.rs
//
// Per-connection state machine:
// CONNECTING → HANDSHAKING → REGISTERED → CLOSING → CLOSED

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use uuid::Uuid;

use crate::codec;
use crate::config::Config;
use crate::constants::{
    EVENT_CLIENT_CONNECTED, EVENT_CLIENT_DISCONNECTED, PROTOCOL_NAME, WRITER_DRAIN_GRACE_MS,
};
use crate::events::audit::EventLog;
use crate::events::model::LogLevel;
use crate::network::client::Client;
use crate::network::dialect::{self, Dialect, Handshake};
use crate::network::directory::Directory;
use crate::network::events::emit_network_event;
use crate::network::message::Message;
use crate::network::writer::ExclusiveWriter;
use crate::protocol::RoutingEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket accepted, nothing read yet
    Connecting,
    /// First line classified, registration pending
    Handshaking,
    /// Registered with the directory, read loop running
    Registered,
    /// Teardown in progress
    Closing,
    /// All resources released
    Closed,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub pd_aux_port: u16,
    pub pd_connect_timeout: Duration,
    pub outbound_queue: usize,
    pub drain_grace: Duration,
    pub max_connections: Option<usize>,
    /// Mirror network diagnostics to the console sink
    pub allow_console: bool,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pd_aux_port: config.pd_aux_port(),
            pd_connect_timeout: Duration::from_millis(config.pd_connect_timeout_ms()),
            outbound_queue: config.outbound_queue(),
            drain_grace: Duration::from_millis(WRITER_DRAIN_GRACE_MS),
            max_connections: config.max_connections,
            allow_console: true,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Collaborators shared by every connection.
#[derive(Clone)]
pub struct ServerContext {
    pub directory: Arc<dyn Directory>,
    pub router: Arc<dyn RoutingEngine>,
    pub event_log: Arc<dyn EventLog>,
    pub settings: SessionSettings,
}

/// A connected socket peer.
///
/// Created at accept time in `Connecting`. Token, dialect and output stream are set once
/// by [`SocketClient::classify`] and never change afterwards.
pub struct SocketClient {
    session_id: String,
    handshake: OnceCell<Handshake>,
    peer_addr: SocketAddr,
    writer: OnceCell<ExclusiveWriter>,
    transitions: Mutex<Vec<SessionState>>,
    torn_down: AtomicBool,
    event_log: Arc<dyn EventLog>,
    allow_console: bool,
}

impl SocketClient {
    pub fn new(peer_addr: SocketAddr, event_log: Arc<dyn EventLog>, allow_console: bool) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            handshake: OnceCell::new(),
            peer_addr,
            writer: OnceCell::new(),
            transitions: Mutex::new(vec![SessionState::Connecting]),
            torn_down: AtomicBool::new(false),
            event_log,
            allow_console,
        }
    }

    pub fn state(&self) -> SessionState {
        self.transitions
            .lock()
            .last()
            .copied()
            .unwrap_or(SessionState::Connecting)
    }

    /// Every state entered so far, oldest first.
    pub fn transitions(&self) -> Vec<SessionState> {
        self.transitions.lock().clone()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    fn set_state(&self, state: SessionState) {
        self.transitions.lock().push(state);
        emit_network_event(
            "session",
            LogLevel::Trace,
            "session_state",
            Some(self.peer_addr),
            Some(format!("token={} state={:?}", self.token(), state)),
            self.allow_console,
        );
    }

    /// Fix token, dialect and output stream. Only the first call takes effect.
    pub fn classify(&self, handshake: Handshake, writer: ExclusiveWriter) -> bool {
        if self.state() != SessionState::Connecting || self.handshake.set(handshake).is_err() {
            return false;
        }
        if self.writer.set(writer).is_err() {
            return false;
        }
        self.set_state(SessionState::Handshaking);
        true
    }

    /// Register with the directory; `false` when the token is taken or empty.
    pub async fn register(self: &Arc<Self>, directory: &dyn Directory) -> bool {
        if self.state() != SessionState::Handshaking {
            return false;
        }
        let handle: Arc<dyn Client> = self.clone();
        if !directory.register(handle).await {
            return false;
        }
        self.set_state(SessionState::Registered);
        true
    }

    /// Frame and queue one outbound line. Dropped silently once teardown has begun.
    pub async fn send_line(&self, line: &str) -> bool {
        if self.torn_down.load(Ordering::Acquire) {
            return false;
        }
        match self.writer.get() {
            Some(writer) => writer.write_line(self.dialect().frame_output(line)).await,
            None => false,
        }
    }

    /// Release the session: output stream, disconnect event, directory entry.
    /// Runs once; later calls return immediately.
    pub async fn teardown(&self, directory: &dyn Directory, drain_grace: Duration) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.set_state(SessionState::Closing);
        if let Some(writer) = self.writer.get() {
            writer.close(drain_grace).await;
        }
        self.event_log.log_connection(
            self.token(),
            PROTOCOL_NAME,
            EVENT_CLIENT_DISCONNECTED,
            SystemTime::now(),
        );
        directory.unregister(self).await;
        self.set_state(SessionState::Closed);
        emit_network_event(
            "session",
            LogLevel::Info,
            "session_closed",
            Some(self.peer_addr),
            Some(format!("token={} dialect={}", self.token(), self.dialect())),
            self.allow_console,
        );
    }

    /// Close a session that never completed its handshake. Nothing was registered or logged.
    fn abandon(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            self.set_state(SessionState::Closed);
        }
    }
}

#[async_trait]
impl Client for SocketClient {
    fn token(&self) -> &str {
        self.handshake.get().map(|h| h.token.as_str()).unwrap_or("")
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn dialect(&self) -> Dialect {
        self.handshake
            .get()
            .map(|h| h.dialect)
            .unwrap_or(Dialect::Oocsi)
    }

    async fn send(&self, mut message: Message) {
        if self.torn_down.load(Ordering::Acquire) {
            return;
        }
        match codec::format_push_line(self.dialect(), &message) {
            Ok(line) => {
                self.send_line(&line).await;
            }
            Err(e) => {
                emit_network_event(
                    "session",
                    LogLevel::Warn,
                    "push_encode_failed",
                    Some(self.peer_addr),
                    Some(format!("token={} error={}", self.token(), e)),
                    self.allow_console,
                );
                return;
            }
        }
        // wire line is already queued; annotation is for the audit log only
        message.add_data("method", self.dialect().name());
        self.event_log.log_event(
            &message.sender,
            &message.recipient,
            &message.data,
            message.timestamp,
        );
    }
}

/// Open the outbound stream for a dialect. PD replies go to a side-channel on the
/// peer's host; the main socket's write half is handed back so it stays open until teardown.
async fn open_output(
    dialect: Dialect,
    write_half: OwnedWriteHalf,
    peer_addr: SocketAddr,
    settings: &SessionSettings,
) -> (ExclusiveWriter, Option<OwnedWriteHalf>) {
    if dialect != Dialect::Pd {
        let writer = ExclusiveWriter::spawn(
            Box::new(write_half),
            settings.outbound_queue,
            peer_addr,
            settings.allow_console,
        );
        return (writer, None);
    }

    let aux_addr = SocketAddr::new(peer_addr.ip(), settings.pd_aux_port);
    let writer = match tokio::time::timeout(
        settings.pd_connect_timeout,
        TcpStream::connect(aux_addr),
    )
    .await
    {
        Ok(Ok(stream)) => {
            emit_network_event(
                "session",
                LogLevel::Debug,
                "pd_aux_connected",
                Some(aux_addr),
                None,
                settings.allow_console,
            );
            ExclusiveWriter::spawn(
                Box::new(stream),
                settings.outbound_queue,
                aux_addr,
                settings.allow_console,
            )
        }
        Ok(Err(e)) => {
            emit_network_event(
                "session",
                LogLevel::Warn,
                "pd_aux_connect_failed",
                Some(aux_addr),
                Some(e.to_string()),
                settings.allow_console,
            );
            ExclusiveWriter::detached()
        }
        Err(_) => {
            emit_network_event(
                "session",
                LogLevel::Warn,
                "pd_aux_connect_timeout",
                Some(aux_addr),
                None,
                settings.allow_console,
            );
            ExclusiveWriter::detached()
        }
    };
    (writer, Some(write_half))
}

/// Read one line as text. Invalid UTF-8 is replaced, never an error.
/// `Ok(None)` at end of stream.
async fn read_text_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(buf);
    Ok(Some(dialect::trim_line_ending(&text).to_string()))
}

/// Drive one accepted connection from handshake to teardown.
pub async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, ctx: ServerContext) {
    let allow_console = ctx.settings.allow_console;
    let client = Arc::new(SocketClient::new(
        peer_addr,
        ctx.event_log.clone(),
        allow_console,
    ));
    emit_network_event(
        "session",
        LogLevel::Debug,
        "session_connecting",
        Some(peer_addr),
        None,
        allow_console,
    );

    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::new();
    let first_line = match read_text_line(&mut reader, &mut buf).await {
        Ok(Some(line)) => line,
        Ok(None) => {
            emit_network_event(
                "session",
                LogLevel::Debug,
                "closed_before_handshake",
                Some(peer_addr),
                None,
                allow_console,
            );
            client.abandon();
            return;
        }
        Err(e) => {
            emit_network_event(
                "session",
                LogLevel::Debug,
                "handshake_read_failed",
                Some(peer_addr),
                Some(e.to_string()),
                allow_console,
            );
            client.abandon();
            return;
        }
    };

    let handshake = dialect::detect(&first_line);
    let (writer, idle_half) =
        open_output(handshake.dialect, write_half, peer_addr, &ctx.settings).await;
    client.classify(handshake, writer);
    emit_network_event(
        "session",
        LogLevel::Info,
        "handshake",
        Some(peer_addr),
        Some(format!("token={} dialect={}", client.token(), client.dialect())),
        allow_console,
    );

    if client.register(ctx.directory.as_ref()).await {
        client
            .send_line(&client.dialect().welcome_line(client.token()))
            .await;
        ctx.event_log.log_connection(
            client.token(),
            PROTOCOL_NAME,
            EVENT_CLIENT_CONNECTED,
            SystemTime::now(),
        );
        let handle: Arc<dyn Client> = client.clone();
        read_loop(&client, &handle, &mut reader, ctx.router.as_ref()).await;
    } else {
        emit_network_event(
            "session",
            LogLevel::Warn,
            "name_already_registered",
            Some(peer_addr),
            Some(format!("token={}", client.token())),
            allow_console,
        );
        client
            .send_line(&client.dialect().reject_line(client.token()))
            .await;
    }

    client
        .teardown(ctx.directory.as_ref(), ctx.settings.drain_grace)
        .await;
    drop(idle_half);
}

async fn read_loop<R>(
    client: &SocketClient,
    handle: &Arc<dyn Client>,
    reader: &mut R,
    router: &dyn RoutingEngine,
) where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        match read_text_line(reader, &mut buf).await {
            Ok(None) => {
                emit_network_event(
                    "session",
                    LogLevel::Debug,
                    "peer_closed_connection",
                    Some(client.peer_addr),
                    Some(format!("token={}", client.token())),
                    client.allow_console,
                );
                break;
            }
            Ok(Some(line)) => {
                let input = client.dialect().unframe_input(&line);
                match router.process_input(handle, &input).await {
                    None => {
                        emit_network_event(
                            "session",
                            LogLevel::Debug,
                            "close_requested",
                            Some(client.peer_addr),
                            Some(format!("token={}", client.token())),
                            client.allow_console,
                        );
                        break;
                    }
                    Some(reply) if reply.is_empty() => {}
                    Some(reply) => {
                        client.send_line(&reply).await;
                    }
                }
            }
            Err(e) => {
                // resets end the session like a normal disconnect
                emit_network_event(
                    "session",
                    LogLevel::Debug,
                    "peer_read_error",
                    Some(client.peer_addr),
                    Some(e.to_string()),
                    client.allow_console,
                );
                break;
            }
        }
    }
}
