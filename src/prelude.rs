//! Curated exports. Import with: `use oocsi_gateway::prelude::*;`

pub use crate::client::{Handler, PushLine};
pub use crate::config::Config;
pub use crate::events::audit::{DispatcherEventLog, EventLog};
pub use crate::network::{
    Client, ClientDirectory, Dialect, Directory, Message, Payload, ServerContext,
    SessionSettings, Value,
};
pub use crate::protocol::{BasicProtocol, RoutingEngine};
