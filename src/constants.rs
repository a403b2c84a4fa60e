//! Central place for application-wide constants and default values.

/// Default application name shown in console output
pub const DEFAULT_APP_NAME: &str = "OOCSI gateway";

/// Left padding used to align log lines with those that include emoji prefixes.
/// Keep this to a fixed width matching the emoji prefix you use elsewhere.
pub const ICON_PLACEHOLDER: &str = "   "; // Three spaces for alignment

/// Transport family name reported to the connection log (independent of dialect)
pub const PROTOCOL_NAME: &str = "OOCSI";

/// Default TCP port the gateway listens on
pub const DEFAULT_PORT: u16 = 4444;

/// Fixed port on the peer's host that PD (dataflow) clients listen on for replies
pub const DEFAULT_PD_AUX_PORT: u16 = 4445;

/// Connect timeout for the PD side-channel (milliseconds)
pub const DEFAULT_PD_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Capacity of each session's outbound line queue
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// How long teardown waits for queued lines to drain before aborting the writer (milliseconds)
pub const WRITER_DRAIN_GRACE_MS: u64 = 2000;

/// Upper bound on a decoded OOCSI payload graph (bytes)
pub const MAX_PAYLOAD_BYTES: u64 = 4 * 1024 * 1024;

/// Marker that selects the JSON dialect in a handshake line
pub const JSON_MARKER: &str = "(JSON)";

/// Line terminator token used by PD clients
pub const PD_TERMINATOR: char = ';';

/// Connection log texts
pub const EVENT_CLIENT_CONNECTED: &str = "client connected";
pub const EVENT_CLIENT_DISCONNECTED: &str = "client disconnected";

/// Application / crate version (populated from Cargo.toml via env! macro)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Human friendly version string used in startup output.
pub fn full_version() -> String {
    format!("v{} (protocol={})", APP_VERSION, PROTOCOL_NAME)
}
