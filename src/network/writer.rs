// src/network/writer.rs

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::model::LogLevel;
use crate::network::events::emit_network_event;

pub type LineSink = Box<dyn AsyncWrite + Unpin + Send>;

/// Single-writer guard for a session's outbound stream.
///
/// Producers queue complete lines; one writer task owns the sink and writes them
/// one at a time, so lines from the read loop and from concurrent pushes never
/// interleave. Once closed (or when detached) every write is silently dropped.
pub struct ExclusiveWriter {
    tx: Mutex<Option<mpsc::Sender<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExclusiveWriter {
    pub fn spawn(sink: LineSink, capacity: usize, peer: SocketAddr, allow_console: bool) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
        let task = tokio::spawn(async move {
            let mut sink = sink;
            while let Some(mut line) = rx.recv().await {
                line.push('\n');
                if let Err(e) = sink.write_all(line.as_bytes()).await {
                    emit_network_event(
                        "writer",
                        LogLevel::Debug,
                        "stream_write_failed",
                        Some(peer),
                        Some(e.to_string()),
                        allow_console,
                    );
                    break;
                }
                if let Err(e) = sink.flush().await {
                    emit_network_event(
                        "writer",
                        LogLevel::Debug,
                        "stream_flush_failed",
                        Some(peer),
                        Some(e.to_string()),
                        allow_console,
                    );
                    break;
                }
            }
            if let Err(e) = sink.shutdown().await {
                emit_network_event(
                    "writer",
                    LogLevel::Debug,
                    "stream_shutdown_failed",
                    Some(peer),
                    Some(e.to_string()),
                    allow_console,
                );
            }
        });
        Self {
            tx: Mutex::new(Some(tx)),
            task: Mutex::new(Some(task)),
        }
    }

    /// A writer without a stream (e.g. PD side-channel could not be opened).
    pub fn detached() -> Self {
        Self {
            tx: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Queue one line (without newline). Returns `false` if it was dropped.
    pub async fn write_line(&self, line: String) -> bool {
        let tx = self.tx.lock().clone();
        match tx {
            Some(tx) => tx.send(line).await.is_ok(),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.tx.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Stop accepting lines, let queued lines drain for up to `grace`, then release the stream.
    pub async fn close(&self, grace: Duration) {
        drop(self.tx.lock().take());
        let task = self.task.lock().take();
        if let Some(mut task) = task {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                task.abort();
            }
        }
    }
}
