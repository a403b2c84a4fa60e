//! Receiving side of the OOCSI dialect.
//!
//! A peer reading pushed `send` lines parses them with [`PushLine::parse`] and hands the
//! decoded event to its [`Handler`] through [`dispatch_send`].

pub mod handler;

pub use handler::{dispatch_send, Handler, PushLine};
