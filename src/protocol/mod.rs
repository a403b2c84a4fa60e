//! Command routing: interprets lines read from a registered client.

pub mod basic;

pub use basic::BasicProtocol;

use async_trait::async_trait;
use std::sync::Arc;

use crate::network::client::Client;

#[async_trait]
pub trait RoutingEngine: Send + Sync {
    /// Interpret one (already unframed) input line from `client`.
    ///
    /// * `None`: close the session
    /// * `Some("")`: processed, nothing to reply
    /// * `Some(reply)`: write `reply` back to the client
    async fn process_input(&self, client: &Arc<dyn Client>, line: &str) -> Option<String>;
}
