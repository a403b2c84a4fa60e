// src/network/client.rs

use async_trait::async_trait;

use crate::network::dialect::Dialect;
use crate::network::message::Message;

/// A registered peer the broker can push messages to.
#[async_trait]
pub trait Client: Send + Sync {
    /// Peer-declared name; directory key and sender identity
    fn token(&self) -> &str;
    /// Unique per connection, distinguishes two sessions that declared the same token
    fn session_id(&self) -> &str;
    fn dialect(&self) -> Dialect;
    /// Serialize and deliver a message. Never fails; a closed client drops it.
    async fn send(&self, message: Message);
}
