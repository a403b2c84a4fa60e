// src/network/listener.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::events::model::LogLevel;
use crate::network::events::emit_network_event;
use crate::network::session::{handle_connection, ServerContext};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn bind_listener(addr: &str) -> std::io::Result<TcpListener> {
    TcpListener::bind(addr).await
}

/// Bind from config and serve until the process exits.
pub async fn start_listener(config: &Config, ctx: ServerContext) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let listener = bind_listener(&addr).await?;
    serve(listener, ctx).await
}

/// Accept loop: one task per connection, optionally capped by `max_connections`.
pub async fn serve(listener: TcpListener, ctx: ServerContext) -> anyhow::Result<()> {
    let allow_console = ctx.settings.allow_console;
    let local_addr = listener.local_addr()?;
    emit_network_event(
        "listener",
        LogLevel::Info,
        "listener_bind",
        Some(local_addr),
        None,
        allow_console,
    );
    let slots = ctx.settings.max_connections.map(|n| Arc::new(Semaphore::new(n)));

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                emit_network_event(
                    "listener",
                    LogLevel::Error,
                    "accept_failed",
                    None,
                    Some(e.to_string()),
                    allow_console,
                );
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        let permit = match &slots {
            Some(slots) => match slots.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    emit_network_event(
                        "listener",
                        LogLevel::Warn,
                        "connection_limit_reached",
                        Some(peer_addr),
                        None,
                        allow_console,
                    );
                    drop(stream);
                    continue;
                }
            },
            None => None,
        };

        emit_network_event(
            "listener",
            LogLevel::Info,
            "incoming_connection",
            Some(peer_addr),
            None,
            allow_console,
        );
        let ctx = ctx.clone();
        tokio::spawn(async move {
            handle_connection(stream, peer_addr, ctx).await;
            drop(permit);
        });
    }
}
