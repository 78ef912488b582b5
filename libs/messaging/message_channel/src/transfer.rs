//! Transfer codec: value + transfer list ⇄ transport envelope.
//!
//! Encoding validates the whole transfer list, serializes the payload, and
//! only then commits the side effects: buffers detach and ports invalidate,
//! all synchronously before the envelope ever reaches the transport. A
//! failed encode therefore leaves every listed object untouched, while a
//! successful one guarantees no local code can use a transferred object
//! again, even if the send itself goes nowhere.

use std::collections::HashSet;

use codec::{DeserializeOptions, SerializeOptions};
use transport::{Envelope, TransferDescriptor};
use types::{SharedBuffer, Value};

use crate::context::ChannelContext;
use crate::error::{DataCloneError, MessageDeliveryError};
use crate::port::MessagePort;

/// One entry of a transfer list. The tag is decided here, at the API
/// boundary — the codec below never probes runtime types.
#[derive(Debug, Clone)]
pub enum TransferEntry {
    Buffer(SharedBuffer),
    Port(MessagePort),
}

impl TransferEntry {
    fn identity(&self) -> usize {
        match self {
            TransferEntry::Buffer(buffer) => buffer.identity(),
            TransferEntry::Port(port) => port.identity(),
        }
    }
}

impl From<SharedBuffer> for TransferEntry {
    fn from(buffer: SharedBuffer) -> Self {
        TransferEntry::Buffer(buffer)
    }
}

impl From<MessagePort> for TransferEntry {
    fn from(port: MessagePort) -> Self {
        TransferEntry::Port(port)
    }
}

/// An object that arrived by transfer, in descriptor order.
#[derive(Debug, Clone)]
pub enum TransferredObject {
    Port(MessagePort),
    Buffer(SharedBuffer),
}

/// Serializes `value` and lifts the transfer list into descriptors.
///
/// `source` is the port `post_message` was called on, if any; listing it in
/// its own transfer list is a contract violation caught before anything is
/// serialized or invalidated.
pub(crate) fn encode_message(
    value: &Value,
    transfer: &[TransferEntry],
    source: Option<&MessagePort>,
) -> Result<Envelope, DataCloneError> {
    let mut seen = HashSet::new();
    for entry in transfer {
        if !seen.insert(entry.identity()) {
            return Err(DataCloneError::DuplicateTransfer);
        }
    }
    if let Some(source) = source {
        let posts_itself = transfer
            .iter()
            .any(|entry| matches!(entry, TransferEntry::Port(port) if port.identity() == source.identity()));
        if posts_itself {
            return Err(DataCloneError::TransferSource);
        }
    }
    for entry in transfer {
        match entry {
            TransferEntry::Buffer(buffer) if buffer.is_detached() => {
                return Err(DataCloneError::AlreadyDetached);
            }
            TransferEntry::Port(port) if port.is_closed() => {
                return Err(DataCloneError::Disentangled);
            }
            _ => {}
        }
    }

    // Side tables in transfer-list order; descriptor positions match the
    // slots the codec records in the payload.
    let mut host_objects = Vec::new();
    let mut transferred_buffers = Vec::new();
    for entry in transfer {
        match entry {
            TransferEntry::Port(port) => host_objects.push(port.host_ref()),
            TransferEntry::Buffer(buffer) => transferred_buffers.push(buffer.clone()),
        }
    }

    // Serialize before committing any side effect, so a non-clonable value
    // never leaves a half-transferred list behind.
    let payload = codec::serialize(
        value,
        &SerializeOptions {
            host_objects: &host_objects,
            transferred_buffers: &transferred_buffers,
        },
    )?;

    // Commit: detach buffers, capture and invalidate port ids.
    let mut transferables = Vec::with_capacity(transfer.len());
    for entry in transfer {
        match entry {
            TransferEntry::Buffer(buffer) => {
                let data = buffer.detach().ok_or(DataCloneError::AlreadyDetached)?;
                transferables.push(TransferDescriptor::Buffer { data });
            }
            TransferEntry::Port(port) => {
                let (id, was_enabled) =
                    port.take_for_transfer().ok_or(DataCloneError::Disentangled)?;
                if was_enabled {
                    // Stand down the port's suspended receive loop so the
                    // new owner gets every envelope from here on.
                    port.context().transport.revoke(id);
                }
                transferables.push(TransferDescriptor::Port { id });
            }
        }
    }
    Ok(Envelope::new(payload, transferables))
}

/// Rebuilds a value graph from an envelope, materializing transferred
/// objects in descriptor order.
pub(crate) fn decode_message(
    envelope: Envelope,
    ctx: &ChannelContext,
) -> Result<(Value, Vec<TransferredObject>), MessageDeliveryError> {
    let mut host_objects = Vec::new();
    let mut transferred_buffers = Vec::new();
    let mut transferred = Vec::with_capacity(envelope.transferables.len());
    for descriptor in envelope.transferables {
        match descriptor {
            TransferDescriptor::Port { id } => {
                let port = MessagePort::from_transferred(id, ctx);
                host_objects.push(port.host_ref());
                transferred.push(TransferredObject::Port(port));
            }
            TransferDescriptor::Buffer { data } => {
                let buffer = SharedBuffer::new(data);
                transferred_buffers.push(buffer.clone());
                transferred.push(TransferredObject::Buffer(buffer));
            }
        }
    }

    let value = codec::deserialize(
        &envelope.payload,
        &DeserializeOptions {
            host_objects: &host_objects,
            transferred_buffers: &transferred_buffers,
        },
    )
    .map_err(|e| MessageDeliveryError::MalformedEnvelope(e.to_string()))?;

    Ok((value, transferred))
}
