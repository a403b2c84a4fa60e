pub mod client;
pub mod dialect;
pub mod directory;
pub(crate) mod events;
pub mod listener;
pub mod message;
pub mod session;
pub mod writer;

pub use client::Client;
pub use dialect::{detect, Dialect, Handshake};
pub use directory::{ClientDirectory, Directory};
pub use listener::{bind_listener, serve, start_listener};
pub use message::{Message, Payload, Value};
pub use session::{handle_connection, ServerContext, SessionSettings, SessionState, SocketClient};
pub use writer::ExclusiveWriter;
