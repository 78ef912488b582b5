//! Channel error taxonomy.
//!
//! Two families, deliberately kept apart:
//!
//! - [`DataCloneError`]: synchronous, raised to the `post_message` /
//!   `structured_clone` caller before anything reaches the transport. Never
//!   delivered as an event.
//! - [`MessageDeliveryError`]: asynchronous, dispatched to "messageerror"
//!   listeners when an incoming envelope cannot be decoded; it permanently
//!   terminates that port's receive loop.
//!
//! Posting on or closing an already-dead port is deliberately *not* an
//! error.

use codec::CodecError;
use thiserror::Error;
use transport::TransportError;

/// A value or transfer list that cannot be serialized for sending.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataCloneError {
    /// The sending port appeared in its own transfer list.
    #[error("a message port cannot be transferred through itself")]
    TransferSource,

    /// A buffer in the transfer list has already had its storage moved.
    #[error("buffer in the transfer list is already detached")]
    AlreadyDetached,

    /// The same object appeared in the transfer list more than once.
    #[error("object listed in the transfer list more than once")]
    DuplicateTransfer,

    /// The port in the transfer list is closed or was already transferred.
    #[error("message port is disentangled and cannot be transferred")]
    Disentangled,

    /// The value graph itself refused to serialize (unlisted host object,
    /// detached buffer outside the transfer list).
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// An incoming envelope that cannot be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageDeliveryError {
    #[error("malformed message envelope: {0}")]
    MalformedEnvelope(String),
}

/// Caller-facing union of everything a channel operation can fail with.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error(transparent)]
    DataClone(#[from] DataCloneError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Delivery(#[from] MessageDeliveryError),
}
