//! In-process transport: entangled queue pairs behind a shared registry.
//!
//! Every endpoint owns one FIFO envelope queue; its entangled peer holds the
//! posting side. Wakeups are edge-triggered: `data` carries a permit so a
//! post just before `recv` suspends is never missed, while `interrupt` wakes
//! only a receiver that is actually suspended, so a stray interrupt can never
//! leak to the endpoint's next owner after a transfer.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tracing::{debug, trace};

use async_trait::async_trait;

use crate::{
    Envelope, PortId, Received, Result, Transport, TransportCounters, TransportStats,
};

pub struct InProcessTransport {
    endpoints: DashMap<PortId, Arc<EndpointState>>,
    next_id: AtomicU64,
    counters: TransportCounters,
}

struct EndpointState {
    peer: PortId,
    queue: Mutex<VecDeque<Envelope>>,
    /// Post-side wakeup; carries a permit so posts are never missed.
    data: Notify,
    /// Waiter-only wakeup for interrupt/revoke.
    interrupt: Notify,
    /// Ownership epoch; bumped by `revoke` under the queue lock.
    epoch: AtomicU64,
    /// This endpoint closed.
    closed: watch::Sender<bool>,
    /// The entangled peer closed (queued envelopes still drain first).
    peer_gone: watch::Sender<bool>,
}

impl EndpointState {
    fn new(peer: PortId) -> Self {
        Self {
            peer,
            queue: Mutex::new(VecDeque::new()),
            data: Notify::new(),
            interrupt: Notify::new(),
            epoch: AtomicU64::new(0),
            closed: watch::channel(false).0,
            peer_gone: watch::channel(false).0,
        }
    }
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
            next_id: AtomicU64::new(1),
            counters: TransportCounters::default(),
        }
    }

    /// Clones out the endpoint state so no registry guard is ever held
    /// across an await point.
    fn state(&self, id: PortId) -> Option<Arc<EndpointState>> {
        self.endpoints.get(&id).map(|entry| Arc::clone(entry.value()))
    }
}

impl Default for InProcessTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InProcessTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessTransport")
            .field("endpoints", &self.endpoints.len())
            .field("stats", &self.counters.snapshot())
            .finish()
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    fn create_entangled(&self) -> (PortId, PortId) {
        let a = PortId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let b = PortId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.endpoints.insert(a, Arc::new(EndpointState::new(b)));
        self.endpoints.insert(b, Arc::new(EndpointState::new(a)));
        self.counters.pairs_created.fetch_add(1, Ordering::Relaxed);
        trace!(%a, %b, "created entangled pair");
        (a, b)
    }

    fn post(&self, id: PortId, envelope: Envelope) -> Result<()> {
        let peer = match self.state(id) {
            Some(state) => state.peer,
            None => {
                self.counters.posts_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(%id, "dropped post from unregistered endpoint");
                return Ok(());
            }
        };
        match self.state(peer) {
            Some(target) if !*target.closed.borrow() => {
                target.queue.lock().push_back(envelope);
                target.data.notify_one();
                self.counters.envelopes_posted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            _ => {
                self.counters.posts_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(%id, %peer, "dropped post to closed peer");
                Ok(())
            }
        }
    }

    async fn recv(&self, id: PortId) -> Result<Received> {
        let state = match self.state(id) {
            Some(state) => state,
            None => return Ok(Received::Closed),
        };
        let epoch = state.epoch.load(Ordering::Acquire);
        let mut closed = state.closed.subscribe();
        let mut peer_gone = state.peer_gone.subscribe();
        loop {
            // Own close wins over queued data: a closed endpoint must not
            // deliver trailing envelopes.
            if *closed.borrow_and_update() {
                return Ok(Received::Closed);
            }
            {
                let mut queue = state.queue.lock();
                // The epoch check shares the queue lock with `revoke`, so a
                // receiver racing an ownership handoff cannot pop an
                // envelope that now belongs to the new owner.
                if state.epoch.load(Ordering::Acquire) != epoch {
                    return Ok(Received::Interrupted);
                }
                if let Some(envelope) = queue.pop_front() {
                    self.counters
                        .envelopes_delivered
                        .fetch_add(1, Ordering::Relaxed);
                    return Ok(Received::Envelope(envelope));
                }
            }
            // Peer close only surfaces once the queue has drained.
            if *peer_gone.borrow_and_update() {
                return Ok(Received::Closed);
            }
            tokio::select! {
                _ = state.data.notified() => {}
                _ = state.interrupt.notified() => return Ok(Received::Interrupted),
                _ = closed.changed() => {}
                _ = peer_gone.changed() => {}
            }
        }
    }

    fn try_recv(&self, id: PortId) -> Result<Option<Envelope>> {
        match self.state(id) {
            Some(state) => {
                let popped = state.queue.lock().pop_front();
                if popped.is_some() {
                    self.counters
                        .envelopes_delivered
                        .fetch_add(1, Ordering::Relaxed);
                }
                Ok(popped)
            }
            None => Ok(None),
        }
    }

    fn close(&self, id: PortId) {
        let state = match self.state(id) {
            Some(state) => state,
            None => return,
        };
        if *state.closed.borrow() {
            return;
        }
        state.closed.send_replace(true);
        let peer_closed = match self.state(state.peer) {
            Some(peer) => {
                peer.peer_gone.send_replace(true);
                *peer.closed.borrow()
            }
            None => true,
        };
        if peer_closed {
            self.endpoints.remove(&id);
            self.endpoints.remove(&state.peer);
        }
        debug!(%id, "closed transport endpoint");
    }

    fn interrupt(&self, id: PortId) {
        if let Some(state) = self.state(id) {
            self.counters.interrupts.fetch_add(1, Ordering::Relaxed);
            state.interrupt.notify_waiters();
        }
    }

    fn revoke(&self, id: PortId) {
        if let Some(state) = self.state(id) {
            {
                let _queue = state.queue.lock();
                state.epoch.fetch_add(1, Ordering::Release);
            }
            state.interrupt.notify_waiters();
            self.counters.revocations.fetch_add(1, Ordering::Relaxed);
            trace!(%id, "revoked endpoint ownership");
        }
    }

    fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }
}
