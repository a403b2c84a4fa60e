// src/protocol/basic.rs
//
// Minimal line router: direct and channel delivery, subscriptions, keep-alive.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::codec::{self, CodecError};
use crate::events::model::LogLevel;
use crate::network::client::Client;
use crate::network::directory::{ClientDirectory, Directory};
use crate::network::events::emit_network_event;
use crate::network::message::{Message, Payload};
use crate::protocol::RoutingEngine;

/// Routing engine backed by a [`ClientDirectory`] and in-memory channel subscriptions.
///
/// Also acts as the session-facing [`Directory`] so a client's subscriptions are dropped
/// when its session unregisters.
///
/// | command | reply |
/// |---|---|
/// | `send <recipient> <base64>` | none |
/// | `sendjson <recipient> <json object>` | none |
/// | `sendraw <recipient> <key=value>*` | none |
/// | `subscribe <channel>` / `unsubscribe <channel>` | none |
/// | `clients` / `channels` | comma separated names |
/// | `ping` | `pong` |
/// | `.` or empty line | none |
/// | `quit` | session closes |
pub struct BasicProtocol {
    directory: ClientDirectory,
    channels: Mutex<HashMap<String, BTreeSet<String>>>,
    allow_console: bool,
}

impl BasicProtocol {
    pub fn new(directory: ClientDirectory) -> Self {
        Self {
            directory,
            channels: Mutex::new(HashMap::new()),
            allow_console: true,
        }
    }

    pub fn with_console(mut self, allow_console: bool) -> Self {
        self.allow_console = allow_console;
        self
    }

    pub fn directory(&self) -> &ClientDirectory {
        &self.directory
    }

    /// Returns `false` if the token was already subscribed.
    pub fn subscribe(&self, channel: &str, token: &str) -> bool {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_default()
            .insert(token.to_string())
    }

    pub fn unsubscribe(&self, channel: &str, token: &str) {
        let mut channels = self.channels.lock();
        if let Some(members) = channels.get_mut(channel) {
            members.remove(token);
            if members.is_empty() {
                channels.remove(channel);
            }
        }
    }

    pub fn subscribers(&self, channel: &str) -> Vec<String> {
        self.channels
            .lock()
            .get(channel)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Deliver to the client named by the recipient, otherwise to every subscriber of
    /// that channel except the sender. Returns the number of deliveries.
    pub async fn publish(&self, message: Message) -> usize {
        if let Some(client) = self.directory.get(&message.recipient).await {
            client.send(message).await;
            return 1;
        }
        let members = self.subscribers(&message.recipient);
        let mut delivered = 0;
        for token in members.iter().filter(|t| **t != message.sender) {
            if let Some(client) = self.directory.get(token).await {
                client.send(message.clone()).await;
                delivered += 1;
            }
        }
        delivered
    }

    fn drop_subscriptions(&self, token: &str) {
        let mut channels = self.channels.lock();
        channels.retain(|_, members| {
            members.remove(token);
            !members.is_empty()
        });
    }

    fn reject_payload(&self, client: &Arc<dyn Client>, command: &str, detail: String) {
        emit_network_event(
            "protocol",
            LogLevel::Warn,
            "payload_dropped",
            None,
            Some(format!(
                "sender={} command={} {}",
                client.token(),
                command,
                detail
            )),
            self.allow_console,
        );
    }

    async fn route(&self, client: &Arc<dyn Client>, recipient: &str, data: Payload) {
        let message = Message::new(client.token(), recipient, data);
        let delivered = self.publish(message).await;
        if delivered == 0 {
            emit_network_event(
                "protocol",
                LogLevel::Debug,
                "no_recipient",
                None,
                Some(format!("sender={} recipient={}", client.token(), recipient)),
                self.allow_console,
            );
        }
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    }
}

#[async_trait]
impl RoutingEngine for BasicProtocol {
    async fn process_input(&self, client: &Arc<dyn Client>, line: &str) -> Option<String> {
        let (command, rest) = split_word(line);
        match command {
            "quit" => None,
            "" | "." => Some(String::new()),
            "ping" => Some("pong".into()),
            "subscribe" => {
                let (channel, _) = split_word(rest);
                if !channel.is_empty() {
                    self.subscribe(channel, client.token());
                }
                Some(String::new())
            }
            "unsubscribe" => {
                let (channel, _) = split_word(rest);
                self.unsubscribe(channel, client.token());
                Some(String::new())
            }
            "clients" => Some(self.directory.list_tokens().await.join(",")),
            "channels" => Some(self.channel_names().join(",")),
            "send" | "sendjson" | "sendraw" => {
                let (recipient, body) = split_word(rest);
                if recipient.is_empty() {
                    self.reject_payload(client, command, "missing recipient".into());
                    return Some(String::new());
                }
                let decoded: Result<Payload, CodecError> = match command {
                    "send" => codec::decode_oocsi(body),
                    "sendjson" => Payload::from_json_text(body).ok_or_else(|| {
                        CodecError::MalformedGraph("body is not a JSON object".into())
                    }),
                    _ => Ok(codec::decode_pd(body)),
                };
                match decoded {
                    Ok(data) => self.route(client, recipient, data).await,
                    Err(e) => self.reject_payload(client, command, e.to_string()),
                }
                Some(String::new())
            }
            _ => Some(String::new()),
        }
    }
}

#[async_trait]
impl Directory for BasicProtocol {
    async fn register(&self, client: Arc<dyn Client>) -> bool {
        self.directory.register(client).await
    }

    async fn unregister(&self, client: &dyn Client) {
        let owned = self
            .directory
            .get(client.token())
            .await
            .is_some_and(|existing| existing.session_id() == client.session_id());
        self.directory.unregister(client).await;
        if owned {
            self.drop_subscriptions(client.token());
        }
    }
}
