//! # OOCSI Gateway
//!
//! Socket front door for an OOCSI-style publish/subscribe broker. Each TCP peer picks one
//! of three line dialects with its first line and keeps it for the whole connection:
//!
//! * **OOCSI:** plain lines, payloads as base64 structural tokens.
//! * **PD:** `;`-terminated lines, `key=value` payloads, replies over a side-channel
//!   opened back to the peer's host.
//! * **JSON:** handshake tagged `(JSON)`, payloads as JSON objects.
//!
//! ## Key Modules
//! * `network` – Listener, per-connection session, dialects, directory, exclusive writer.
//! * `codec` – Payload translation for each dialect.
//! * `protocol` – Routing engine seam plus a basic direct/channel router.
//! * `client` – Receiving side: parse pushed lines and dispatch to a handler.
//! * `events` – Structured logging/events dispatcher and the audit `EventLog`.
//! * `config` – TOML runtime configuration.

pub mod client;
pub mod codec;
pub mod config;
pub mod constants;
pub mod events;
pub mod network;
pub mod prelude; // curated re-exports
pub mod protocol;
