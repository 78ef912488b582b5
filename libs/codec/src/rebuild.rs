//! Graph rebuilding: bytes → node table → `Value`, with side-table splicing.

use types::{HostRef, SharedBuffer, SharedList, SharedMap, Value};

use crate::error::CodecError;
use crate::{FlatGraph, FlatNode};

/// Positional side-tables spliced into the rebuilt graph.
///
/// Slot `i` recorded in the payload resolves to entry `i` here; a slot with
/// no entry fails with [`CodecError::MissingReference`].
#[derive(Debug, Clone, Copy)]
pub struct DeserializeOptions<'a> {
    pub host_objects: &'a [HostRef],
    pub transferred_buffers: &'a [SharedBuffer],
}

impl Default for DeserializeOptions<'_> {
    fn default() -> Self {
        Self {
            host_objects: &[],
            transferred_buffers: &[],
        }
    }
}

/// Rebuilds a value graph from payload bytes.
///
/// Containers are allocated as empty shells first and linked in a second
/// pass, so back-edges (cycles) and aliased subtrees come back with the same
/// shape and sharing they had on the sending side.
pub fn deserialize(bytes: &[u8], options: &DeserializeOptions<'_>) -> Result<Value, CodecError> {
    let graph: FlatGraph =
        bincode::deserialize(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
    let node_count = graph.nodes.len();
    if graph.root as usize >= node_count {
        return Err(CodecError::Malformed(format!(
            "root index {} out of bounds ({} nodes)",
            graph.root, node_count
        )));
    }

    // Pass 1: allocate one value per node.
    let mut values: Vec<Value> = Vec::with_capacity(node_count);
    for node in &graph.nodes {
        values.push(match node {
            FlatNode::Null => Value::Null,
            FlatNode::Bool(v) => Value::Bool(*v),
            FlatNode::Int(v) => Value::Int(*v),
            FlatNode::Float(v) => Value::Float(*v),
            FlatNode::Text(v) => Value::Text(v.clone()),
            FlatNode::BufferCopy(data) => Value::Buffer(SharedBuffer::from_slice(data)),
            FlatNode::BufferRef(slot) => Value::Buffer(
                options
                    .transferred_buffers
                    .get(*slot as usize)
                    .ok_or(CodecError::MissingReference {
                        table: "transferred-buffer",
                        index: *slot,
                        provided: options.transferred_buffers.len(),
                    })?
                    .clone(),
            ),
            FlatNode::HostObject(slot) => Value::Host(
                options
                    .host_objects
                    .get(*slot as usize)
                    .ok_or(CodecError::MissingReference {
                        table: "host-object",
                        index: *slot,
                        provided: options.host_objects.len(),
                    })?
                    .clone(),
            ),
            FlatNode::List(_) => Value::List(SharedList::new()),
            FlatNode::Map(_) => Value::Map(SharedMap::new()),
        });
    }

    // Pass 2: link container children by index.
    for (node, value) in graph.nodes.iter().zip(&values) {
        match (node, value) {
            (FlatNode::List(children), Value::List(list)) => {
                for &child in children {
                    let item = values.get(child as usize).ok_or_else(|| {
                        CodecError::Malformed(format!("list child index {child} out of bounds"))
                    })?;
                    list.push(item.clone());
                }
            }
            (FlatNode::Map(entries), Value::Map(map)) => {
                for (key, child) in entries {
                    let item = values.get(*child as usize).ok_or_else(|| {
                        CodecError::Malformed(format!("map child index {child} out of bounds"))
                    })?;
                    map.insert(key.clone(), item.clone());
                }
            }
            _ => {}
        }
    }

    Ok(values[graph.root as usize].clone())
}
