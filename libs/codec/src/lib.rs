//! # Weft Value Codec
//!
//! Serializes a structured [`types::Value`] graph into a transport-ready byte
//! payload and back, preserving cycles and aliasing. Out-of-band objects are
//! never embedded in the payload: the caller passes explicit positional
//! side-tables and the payload only records *slot numbers* into them.
//!
//! ## How it works
//!
//! Serialization flattens the graph into an index-linked node table
//! (`FlatGraph`): every shared container and buffer is visited once, keyed by
//! its allocation identity, and children refer to nodes by index. A cycle is
//! just an index pointing back at an earlier node, so no special casing is
//! needed on the wire. The table itself is encoded with bincode.
//!
//! Two kinds of node leave the payload by reference rather than by copy:
//!
//! - a buffer listed in [`SerializeOptions::transferred_buffers`] becomes a
//!   `BufferRef(slot)` — its bytes are moved out of band, not copied;
//! - a [`types::HostRef`] must appear in [`SerializeOptions::host_objects`]
//!   and becomes a `HostObject(slot)`; a host object missing from the table
//!   is simply not clonable ([`CodecError::NotClonable`]).
//!
//! Deserialization rebuilds the graph in two passes (shells first, links
//! second) and splices the side-table entries back into their slots, which is
//! how a message can carry a port or a moved buffer at arbitrary depth.

pub mod error;
mod flatten;
mod rebuild;

pub use error::CodecError;
pub use flatten::{serialize, SerializeOptions};
pub use rebuild::{deserialize, DeserializeOptions};

pub(crate) use flatten::{FlatGraph, FlatNode};
