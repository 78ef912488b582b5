//! Events delivered to port listeners.

use types::Value;

use crate::error::MessageDeliveryError;
use crate::port::MessagePort;
use crate::transfer::TransferredObject;

/// A successfully delivered message.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// The reconstructed value graph.
    pub data: Value,
    /// Transferred ports, in descriptor order. Transferred buffers are not
    /// listed here; they arrive spliced into `data`.
    pub ports: Vec<MessagePort>,
}

impl MessageEvent {
    pub(crate) fn new(data: Value, transferred: Vec<TransferredObject>) -> Self {
        let ports = transferred
            .into_iter()
            .filter_map(|object| match object {
                TransferredObject::Port(port) => Some(port),
                TransferredObject::Buffer(_) => None,
            })
            .collect();
        Self { data, ports }
    }
}

/// An envelope that arrived but could not be decoded. Delivery on the port
/// stops permanently after this event.
#[derive(Debug, Clone)]
pub struct MessageErrorEvent {
    pub error: MessageDeliveryError,
}
