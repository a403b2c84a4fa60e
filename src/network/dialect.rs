// src/network/dialect.rs

use std::borrow::Cow;
use std::fmt;

use crate::constants::{JSON_MARKER, PD_TERMINATOR};

/// Wire sub-protocol a connection speaks. Fixed at handshake for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Native clients: base64 object-graph payloads
    Oocsi,
    /// Legacy dataflow clients: `key=value` tokens, `;` line terminator, replies on a side-channel
    Pd,
    /// Generic clients: one JSON object per line
    Json,
}

/// Outcome of classifying the first line of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub dialect: Dialect,
    pub token: String,
}

/// Classify a handshake line. Precedence: `;` (PD), then `(JSON)` marker, else OOCSI.
pub fn detect(first_line: &str) -> Handshake {
    if first_line.contains(PD_TERMINATOR) {
        Handshake {
            dialect: Dialect::Pd,
            token: first_line.replace(PD_TERMINATOR, ""),
        }
    } else if first_line.contains(JSON_MARKER) {
        Handshake {
            dialect: Dialect::Json,
            token: first_line.replace(JSON_MARKER, "").trim().to_string(),
        }
    } else {
        Handshake {
            dialect: Dialect::Oocsi,
            token: first_line.to_string(),
        }
    }
}

/// Strip a trailing `\n` or `\r\n` left by `read_line`.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Oocsi => "OOCSI",
            Dialect::Pd => "PD",
            Dialect::Json => "JSON",
        }
    }

    /// Apply outbound line framing (newline is added by the writer).
    pub fn frame_output(&self, line: &str) -> String {
        match self {
            Dialect::Pd => {
                let mut framed = String::with_capacity(line.len() + 1);
                framed.push_str(line);
                framed.push(PD_TERMINATOR);
                framed
            }
            Dialect::Oocsi | Dialect::Json => line.to_string(),
        }
    }

    /// Remove inbound line framing.
    pub fn unframe_input<'a>(&self, line: &'a str) -> Cow<'a, str> {
        match self {
            Dialect::Pd if line.contains(PD_TERMINATOR) => {
                Cow::Owned(line.replace(PD_TERMINATOR, ""))
            }
            _ => Cow::Borrowed(line),
        }
    }

    pub fn welcome_line(&self, token: &str) -> String {
        match self {
            Dialect::Json => format!("{{'message' : \"welcome {}\"}}", json_escape(token)),
            Dialect::Oocsi | Dialect::Pd => format!("welcome {}", token),
        }
    }

    /// The same plain error text in every dialect; JSON peers get the token escaped.
    pub fn reject_line(&self, token: &str) -> String {
        match self {
            Dialect::Json => format!("error (name already registered: {})", json_escape(token)),
            Dialect::Oocsi | Dialect::Pd => format!("error (name already registered: {})", token),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Escape text for use inside a JSON string literal (without surrounding quotes).
fn json_escape(text: &str) -> String {
    let quoted = serde_json::Value::String(text.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
