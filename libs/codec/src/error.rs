//! Codec error taxonomy.
//!
//! Serialization failures are always synchronous and surface to the caller
//! that attempted the clone or post; deserialization failures describe a
//! malformed payload and are reported by the delivery layer as message
//! errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A host object appeared in the value graph without a matching entry in
    /// the serialize side-table. Ports and similar objects can only cross a
    /// message boundary by being transferred explicitly.
    #[error("value of kind '{kind}' cannot be cloned: not listed as a transferable host object")]
    NotClonable { kind: &'static str },

    /// A buffer in the value graph has already had its storage moved away.
    #[error("buffer is detached: its storage was already transferred away")]
    DetachedBuffer,

    /// The payload references a side-table slot the caller did not provide.
    #[error("payload references {table} slot {index}, but only {provided} entries were provided")]
    MissingReference {
        table: &'static str,
        index: u32,
        provided: usize,
    },

    /// The payload bytes do not decode to a well-formed node table.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The node table failed to encode.
    #[error("payload could not be encoded: {0}")]
    Encode(String),
}
