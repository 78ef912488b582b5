//! Process liveness registry.
//!
//! Shared by every port created from the same [`crate::ChannelContext`]: the
//! embedder polls [`LivenessRegistry::is_process_kept_alive`] to decide
//! whether pending message traffic should keep the process running. Sharing
//! is explicit in the type — each port receives the registry at
//! construction, there is no module-global state.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counted "message" listener registrations across all ports in a context.
///
/// This is a true reference count: every decrement removes exactly one
/// contribution and saturates at zero.
#[derive(Debug, Default)]
pub struct LivenessRegistry {
    active: AtomicUsize,
}

impl LivenessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&self) {
        self.active.fetch_add(1, Ordering::SeqCst);
    }

    pub fn decr(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Number of currently contributing listener registrations.
    pub fn active_listeners(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// True while at least one ref'd port has a "message" listener.
    pub fn is_process_kept_alive(&self) -> bool {
        self.active_listeners() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_saturates_at_zero() {
        let registry = LivenessRegistry::new();
        registry.decr();
        assert_eq!(registry.active_listeners(), 0);

        registry.incr();
        registry.incr();
        registry.decr();
        assert!(registry.is_process_kept_alive());
        registry.decr();
        assert!(!registry.is_process_kept_alive());
    }
}
