// src/codec/oocsi.rs
//
// Native payload encoding: the data map is flattened into an index-linked node
// graph, serialized with bincode and carried as a single base64 token.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bincode::Options;
use serde::{Deserialize, Serialize};

use super::CodecError;
use crate::constants::MAX_PAYLOAD_BYTES;
use crate::network::message::{Payload, Value};

const GRAPH_VERSION: u8 = 1;
const MAX_GRAPH_DEPTH: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
enum Node {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Entries point at child nodes by index; children always follow their parent.
    Map(Vec<(String, u32)>),
}

#[derive(Debug, Serialize, Deserialize)]
struct Graph {
    version: u8,
    nodes: Vec<Node>,
}

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_PAYLOAD_BYTES)
}

/// Encode a payload as one base64 token (no whitespace, no `;`).
pub fn encode_oocsi(data: &Payload) -> Result<String, CodecError> {
    let mut nodes = Vec::new();
    push_map(data, &mut nodes);
    let graph = Graph {
        version: GRAPH_VERSION,
        nodes,
    };
    let bytes = options()
        .serialize(&graph)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Decode a base64 token produced by [`encode_oocsi`].
pub fn decode_oocsi(token: &str) -> Result<Payload, CodecError> {
    let bytes = STANDARD
        .decode(token.trim())
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))?;
    let graph: Graph = options()
        .deserialize(&bytes)
        .map_err(|e| CodecError::MalformedGraph(e.to_string()))?;
    if graph.version != GRAPH_VERSION {
        return Err(malformed(format!("unsupported graph version {}", graph.version)));
    }
    rebuild(graph.nodes)
}

fn push_map(map: &Payload, nodes: &mut Vec<Node>) -> u32 {
    let idx = nodes.len();
    nodes.push(Node::Map(Vec::new()));
    let entries = map
        .iter()
        .map(|(key, value)| (key.clone(), push_value(value, nodes)))
        .collect();
    nodes[idx] = Node::Map(entries);
    idx as u32
}

fn push_value(value: &Value, nodes: &mut Vec<Node>) -> u32 {
    let node = match value {
        Value::Map(map) => return push_map(map, nodes),
        Value::String(s) => Node::Text(s.clone()),
        Value::Integer(i) => Node::Integer(*i),
        Value::Float(f) => Node::Float(*f),
        Value::Boolean(b) => Node::Boolean(*b),
    };
    nodes.push(node);
    (nodes.len() - 1) as u32
}

fn malformed(reason: impl Into<String>) -> CodecError {
    CodecError::MalformedGraph(reason.into())
}

/// Rebuild the value tree without recursion. The graph must be a tree rooted at
/// node 0 (a map) where every other node has exactly one parent with a smaller index.
fn rebuild(nodes: Vec<Node>) -> Result<Payload, CodecError> {
    match nodes.first() {
        Some(Node::Map(_)) => {}
        Some(_) => return Err(malformed("root node is not a map")),
        None => return Err(malformed("empty graph")),
    }

    let count = nodes.len();
    let mut depth = vec![0usize; count];
    let mut referenced = vec![false; count];
    referenced[0] = true;
    for (idx, node) in nodes.iter().enumerate() {
        if let Node::Map(entries) = node {
            for (_, child) in entries {
                let child = *child as usize;
                if child <= idx || child >= count {
                    return Err(malformed(format!("node {} has invalid child {}", idx, child)));
                }
                if referenced[child] {
                    return Err(malformed(format!("node {} referenced twice", child)));
                }
                referenced[child] = true;
                depth[child] = depth[idx] + 1;
                if depth[child] > MAX_GRAPH_DEPTH {
                    return Err(malformed("graph nested too deeply"));
                }
            }
        }
    }
    if let Some(orphan) = referenced.iter().position(|r| !r) {
        return Err(malformed(format!("node {} is unreachable", orphan)));
    }

    let mut built: Vec<Option<Value>> = (0..count).map(|_| None).collect();
    for (idx, node) in nodes.into_iter().enumerate().rev() {
        let value = match node {
            Node::Text(s) => Value::String(s),
            Node::Integer(i) => Value::Integer(i),
            Node::Float(f) => Value::Float(f),
            Node::Boolean(b) => Value::Boolean(b),
            Node::Map(entries) => {
                let mut map = Payload::new();
                for (key, child) in entries {
                    let value = built[child as usize]
                        .take()
                        .ok_or_else(|| malformed(format!("node {} missing", child)))?;
                    if map.insert(key.clone(), value).is_some() {
                        return Err(malformed(format!("duplicate key '{}'", key)));
                    }
                }
                Value::Map(map)
            }
        };
        built[idx] = Some(value);
    }

    match built.swap_remove(0) {
        Some(Value::Map(root)) => Ok(root),
        _ => Err(malformed("root node is not a map")),
    }
}
