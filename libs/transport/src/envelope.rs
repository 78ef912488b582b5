//! Wire units: endpoint ids, transfer descriptors, envelopes.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque handle to one end of an entangled pair.
///
/// The id itself is freely copyable; *ownership* of the endpoint is the
/// message-channel layer's invariant, enforced by invalidating the sending
/// side during transfer serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub(crate) u64);

impl PortId {
    /// Raw id, for diagnostics only.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "port#{}", self.0)
    }
}

/// One transferred object, carried out of band next to the payload.
///
/// Descriptor order is significant: the payload references transferred
/// objects by their position in this sequence.
#[derive(Debug, Clone)]
pub enum TransferDescriptor {
    /// Ownership of the endpoint behind `id` moves to the receiver.
    Port { id: PortId },
    /// Moved buffer storage; the source buffer is already detached.
    Buffer { data: Vec<u8> },
}

/// Serialized payload plus its ordered transferable descriptors.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub payload: Bytes,
    pub transferables: Vec<TransferDescriptor>,
}

impl Envelope {
    pub fn new(payload: Bytes, transferables: Vec<TransferDescriptor>) -> Self {
        Self {
            payload,
            transferables,
        }
    }
}

/// Outcome of a `recv` on an endpoint.
#[derive(Debug)]
pub enum Received {
    Envelope(Envelope),
    /// The endpoint (or its peer, after the queue drained) closed cleanly.
    Closed,
    /// Woken without data: an explicit interrupt or an ownership revocation.
    Interrupted,
}
