//! Delivery counters for the in-process transport.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters updated on the delivery paths.
#[derive(Debug, Default)]
pub struct TransportCounters {
    pub pairs_created: AtomicU64,
    pub envelopes_posted: AtomicU64,
    pub envelopes_delivered: AtomicU64,
    /// Posts aimed at a closed or unknown endpoint (fire into the void).
    pub posts_dropped: AtomicU64,
    pub interrupts: AtomicU64,
    pub revocations: AtomicU64,
}

impl TransportCounters {
    pub fn snapshot(&self) -> TransportStats {
        TransportStats {
            pairs_created: self.pairs_created.load(Ordering::Relaxed),
            envelopes_posted: self.envelopes_posted.load(Ordering::Relaxed),
            envelopes_delivered: self.envelopes_delivered.load(Ordering::Relaxed),
            posts_dropped: self.posts_dropped.load(Ordering::Relaxed),
            interrupts: self.interrupts.load(Ordering::Relaxed),
            revocations: self.revocations.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`TransportCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub pairs_created: u64,
    pub envelopes_posted: u64,
    pub envelopes_delivered: u64,
    pub posts_dropped: u64,
    pub interrupts: u64,
    pub revocations: u64,
}
