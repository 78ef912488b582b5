//! # Weft Transport Layer
//!
//! The opaque boundary that carries serialized message envelopes between the
//! two ends of an entangled pair. Everything above this crate treats a
//! [`PortId`] as a capability: whoever holds the id owns the endpoint, and
//! ownership moves by carrying the id inside a [`TransferDescriptor`].
//!
//! The [`Transport`] trait is the seam: the message-channel layer is written
//! against it, the in-process implementation here backs production use, and
//! tests substitute failing or instrumented doubles.
//!
//! ## Delivery model
//!
//! - one FIFO queue per endpoint; per-endpoint ordering is guaranteed,
//!   cross-endpoint ordering is not;
//! - `recv` suspends cooperatively and resolves to [`Received::Envelope`],
//!   [`Received::Closed`] (own side or peer side closed cleanly) or
//!   [`Received::Interrupted`] (woken without data);
//! - `close` wakes any suspended `recv` on the closed endpoint so its next
//!   resume observes `Closed`;
//! - `revoke` hands the endpoint to a new owner: it bumps the ownership
//!   epoch, so a receiver that raced a data wakeup during the handoff stands
//!   down with `Interrupted` instead of stealing the new owner's message.

pub mod envelope;
pub mod error;
pub mod inprocess;
pub mod metrics;

#[cfg(test)]
mod tests;

use async_trait::async_trait;

pub use envelope::{Envelope, PortId, Received, TransferDescriptor};
pub use error::TransportError;
pub use inprocess::InProcessTransport;
pub use metrics::{TransportCounters, TransportStats};

pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport primitives consumed by the message-channel layer.
///
/// Implementations must deliver envelopes posted on one endpoint to its
/// entangled peer in FIFO order. All operations on an unknown or fully
/// closed endpoint are benign: posts vanish, `recv` reports `Closed`,
/// `close` is a no-op. Errors are reserved for genuine backend failures and
/// are fatal to the caller's receive loop.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Creates a fresh entangled pair; each id delivers to the other.
    fn create_entangled(&self) -> (PortId, PortId);

    /// Queues an envelope for delivery to the peer of `id`.
    fn post(&self, id: PortId, envelope: Envelope) -> Result<()>;

    /// Waits for the next event on `id`. Cancellation-safe: dropping the
    /// future never loses an envelope.
    async fn recv(&self, id: PortId) -> Result<Received>;

    /// Pops one queued envelope without waiting.
    fn try_recv(&self, id: PortId) -> Result<Option<Envelope>>;

    /// Closes `id`: wakes its suspended receiver, signals the peer once its
    /// queue drains, and releases pair state when both sides are closed.
    fn close(&self, id: PortId);

    /// Wakes a currently suspended `recv` on `id` with `Interrupted`.
    /// A wakeup with no receiver waiting is discarded, never queued.
    fn interrupt(&self, id: PortId);

    /// Revokes the current owner's claim on `id` ahead of an ownership
    /// transfer; any in-flight `recv` observes `Interrupted` and must not
    /// consume further envelopes.
    fn revoke(&self, id: PortId);

    /// Point-in-time delivery counters.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}
