// src/network/directory.rs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::network::client::Client;

/// Name registry enforcing token uniqueness across connections.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Atomic test-and-set: `false` if the token is empty or already taken.
    async fn register(&self, client: Arc<dyn Client>) -> bool;
    /// Remove the client's entry if (and only if) it is this very session.
    async fn unregister(&self, client: &dyn Client);
}

/// In-memory directory keyed by token.
#[derive(Clone, Default)]
pub struct ClientDirectory {
    clients: Arc<Mutex<HashMap<String, Arc<dyn Client>>>>,
}

impl ClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, token: &str) -> Option<Arc<dyn Client>> {
        self.clients.lock().await.get(token).cloned()
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.clients.lock().await.contains_key(token)
    }

    /// Registered tokens, sorted
    pub async fn list_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.clients.lock().await.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}

#[async_trait]
impl Directory for ClientDirectory {
    async fn register(&self, client: Arc<dyn Client>) -> bool {
        if client.token().is_empty() {
            return false;
        }
        let mut clients = self.clients.lock().await;
        if clients.contains_key(client.token()) {
            return false;
        }
        clients.insert(client.token().to_string(), client);
        true
    }

    async fn unregister(&self, client: &dyn Client) {
        let mut clients = self.clients.lock().await;
        let same_session = clients
            .get(client.token())
            .is_some_and(|existing| existing.session_id() == client.session_id());
        if same_session {
            clients.remove(client.token());
        }
    }
}
