//! Graph flattening: `Value` → index-linked node table → bytes.

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use types::{HostRef, SharedBuffer, Value};

use crate::error::CodecError;

/// One node of the flattened graph. Children are node indices, which is what
/// lets cycles and aliased subtrees serialize without special handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum FlatNode {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Buffer contents copied into the payload.
    BufferCopy(Vec<u8>),
    /// Slot into the transferred-buffers side-table.
    BufferRef(u32),
    /// Slot into the host-objects side-table.
    HostObject(u32),
    List(Vec<u32>),
    Map(Vec<(String, u32)>),
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct FlatGraph {
    pub root: u32,
    pub nodes: Vec<FlatNode>,
}

/// Positional side-tables consulted during serialization.
///
/// Entries are matched by allocation identity. Positions assigned in the
/// payload are positions in these slices, so the caller controls the order
/// in which out-of-band objects travel.
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions<'a> {
    pub host_objects: &'a [HostRef],
    pub transferred_buffers: &'a [SharedBuffer],
}

impl Default for SerializeOptions<'_> {
    fn default() -> Self {
        Self {
            host_objects: &[],
            transferred_buffers: &[],
        }
    }
}

/// Serializes a value graph into payload bytes.
///
/// Buffers listed in `transferred_buffers` are recorded as reference slots
/// and are *not* read here; moving their storage is the caller's step, after
/// this call has succeeded. Any other buffer is deep-copied into the payload,
/// failing with [`CodecError::DetachedBuffer`] if its storage is gone.
pub fn serialize(value: &Value, options: &SerializeOptions<'_>) -> Result<Bytes, CodecError> {
    let mut flattener = Flattener {
        options,
        nodes: Vec::new(),
        seen: HashMap::new(),
    };
    let root = flattener.visit(value)?;
    let graph = FlatGraph {
        root,
        nodes: flattener.nodes,
    };
    let encoded = bincode::serialize(&graph).map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(Bytes::from(encoded))
}

struct Flattener<'a> {
    options: &'a SerializeOptions<'a>,
    nodes: Vec<FlatNode>,
    /// Allocation identity → node index, for containers and buffers.
    seen: HashMap<usize, u32>,
}

impl Flattener<'_> {
    fn visit(&mut self, value: &Value) -> Result<u32, CodecError> {
        match value {
            Value::Null => Ok(self.push(FlatNode::Null)),
            Value::Bool(v) => Ok(self.push(FlatNode::Bool(*v))),
            Value::Int(v) => Ok(self.push(FlatNode::Int(*v))),
            Value::Float(v) => Ok(self.push(FlatNode::Float(*v))),
            Value::Text(v) => Ok(self.push(FlatNode::Text(v.clone()))),
            Value::Buffer(buffer) => {
                if let Some(&index) = self.seen.get(&buffer.identity()) {
                    return Ok(index);
                }
                let node = match slot_of_buffer(self.options.transferred_buffers, buffer) {
                    Some(slot) => FlatNode::BufferRef(slot),
                    None => {
                        let data = buffer.snapshot().ok_or(CodecError::DetachedBuffer)?;
                        FlatNode::BufferCopy(data)
                    }
                };
                let index = self.push(node);
                self.seen.insert(buffer.identity(), index);
                Ok(index)
            }
            Value::Host(host) => {
                if let Some(&index) = self.seen.get(&host.identity()) {
                    return Ok(index);
                }
                let slot = self
                    .options
                    .host_objects
                    .iter()
                    .position(|h| h.identity() == host.identity())
                    .ok_or(CodecError::NotClonable { kind: host.kind() })?;
                let index = self.push(FlatNode::HostObject(slot as u32));
                self.seen.insert(host.identity(), index);
                Ok(index)
            }
            Value::List(list) => {
                if let Some(&index) = self.seen.get(&list.identity()) {
                    return Ok(index);
                }
                // Reserve the slot before descending so back-edges resolve.
                let index = self.push(FlatNode::List(Vec::new()));
                self.seen.insert(list.identity(), index);
                let children = list.with_items(|items| {
                    items
                        .iter()
                        .map(|item| self.visit(item))
                        .collect::<Result<Vec<u32>, CodecError>>()
                })?;
                self.nodes[index as usize] = FlatNode::List(children);
                Ok(index)
            }
            Value::Map(map) => {
                if let Some(&index) = self.seen.get(&map.identity()) {
                    return Ok(index);
                }
                let index = self.push(FlatNode::Map(Vec::new()));
                self.seen.insert(map.identity(), index);
                let entries = map.with_entries(|entries| {
                    entries
                        .iter()
                        .map(|(key, item)| Ok((key.clone(), self.visit(item)?)))
                        .collect::<Result<Vec<(String, u32)>, CodecError>>()
                })?;
                self.nodes[index as usize] = FlatNode::Map(entries);
                Ok(index)
            }
        }
    }

    fn push(&mut self, node: FlatNode) -> u32 {
        let index = self.nodes.len() as u32;
        self.nodes.push(node);
        index
    }
}

fn slot_of_buffer(table: &[SharedBuffer], buffer: &SharedBuffer) -> Option<u32> {
    table
        .iter()
        .position(|b| b.identity() == buffer.identity())
        .map(|slot| slot as u32)
}
