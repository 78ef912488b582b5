//! Message port endpoints and their receive loops.
//!
//! A [`MessagePort`] is one end of an entangled pair. Its receive loop is a
//! tokio task that suspends inside `Transport::recv` and resumes on data,
//! clean close, or interrupt. Lifecycle rules:
//!
//! - the loop runs while `enabled` is set; every exit path clears it;
//! - a clean close from either side fires the close callback exactly once;
//! - one undecodable envelope dispatches "messageerror" and permanently
//!   ends delivery on that port;
//! - a transport error is fatal to the loop and surfaces at the task
//!   boundary; it is never retried.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, trace};
use transport::{PortId, Received, TransportError};
use types::{HostRef, Value};

use crate::context::ChannelContext;
use crate::error::ChannelError;
use crate::event::{MessageErrorEvent, MessageEvent};
use crate::transfer::{decode_message, encode_message, TransferEntry};

pub(crate) const PORT_HOST_KIND: &str = "message-port";

/// Handle returned by listener registration, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type MessageListener = Arc<dyn Fn(MessageEvent) + Send + Sync>;
type MessageErrorListener = Arc<dyn Fn(MessageErrorEvent) + Send + Sync>;

/// Options accepted by [`MessagePort::post_message_with`]. A plain transfer
/// list converts directly.
#[derive(Debug, Default)]
pub struct PostMessageOptions {
    pub transfer: Vec<TransferEntry>,
}

impl From<Vec<TransferEntry>> for PostMessageOptions {
    fn from(transfer: Vec<TransferEntry>) -> Self {
        Self { transfer }
    }
}

/// One end of an entangled message channel.
///
/// Clones share the same endpoint. Created only by
/// [`crate::MessageChannel::new`] or by materializing an incoming transfer.
#[derive(Clone)]
pub struct MessagePort {
    pub(crate) inner: Arc<PortInner>,
}

pub(crate) struct PortInner {
    pub(crate) ctx: ChannelContext,
    state: Mutex<PortState>,
}

struct PortState {
    /// Present while entangled and open; `None` once closed or transferred.
    transport_id: Option<PortId>,
    /// True exactly while a receive loop task is active.
    enabled: bool,
    /// One-shot: the next `Interrupted` resumes the loop instead of ending it.
    pending_interrupt: bool,
    /// Explicit opt-out from process liveness accounting.
    unrefed: bool,
    /// Listener registrations currently counted in the liveness registry.
    contributed: usize,
    close_invoked: bool,
    on_close: Option<Box<dyn FnOnce() + Send>>,
    next_listener_id: u64,
    message_listeners: Vec<(ListenerId, MessageListener)>,
    message_error_listeners: Vec<(ListenerId, MessageErrorListener)>,
}

impl PortState {
    fn new(transport_id: PortId) -> Self {
        Self {
            transport_id: Some(transport_id),
            enabled: false,
            pending_interrupt: false,
            unrefed: false,
            contributed: 0,
            close_invoked: false,
            on_close: None,
            next_listener_id: 0,
            message_listeners: Vec::new(),
            message_error_listeners: Vec::new(),
        }
    }

    fn alloc_listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        id
    }
}

impl MessagePort {
    pub(crate) fn new(id: PortId, ctx: ChannelContext) -> Self {
        Self {
            inner: Arc::new(PortInner {
                ctx,
                state: Mutex::new(PortState::new(id)),
            }),
        }
    }

    /// Materializes the local end of a transferred endpoint.
    pub(crate) fn from_transferred(id: PortId, ctx: &ChannelContext) -> Self {
        Self::new(id, ctx.clone())
    }

    /// Posts `value` with an empty transfer list.
    pub fn post_message(&self, value: &Value) -> Result<(), ChannelError> {
        self.post_message_with(value, PostMessageOptions::default())
    }

    /// Posts `value`, moving the listed transferables to the peer.
    ///
    /// Transfer side effects commit during serialization: once this returns,
    /// listed buffers are detached and listed ports invalidated even if the
    /// port itself was already dead and the envelope went nowhere.
    pub fn post_message_with(
        &self,
        value: &Value,
        options: impl Into<PostMessageOptions>,
    ) -> Result<(), ChannelError> {
        let options = options.into();
        let envelope = encode_message(value, &options.transfer, Some(self))?;
        let id = match self.inner.state.lock().transport_id {
            Some(id) => id,
            None => {
                trace!("post on dead port discarded");
                return Ok(());
            }
        };
        self.inner.ctx.transport.post(id, envelope)?;
        Ok(())
    }

    /// Starts the receive loop. Idempotent; a closed port stays stopped.
    pub fn start(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.enabled || state.transport_id.is_none() {
                return;
            }
            state.enabled = true;
        }
        spawn_receive_loop(Arc::clone(&self.inner));
    }

    /// Closes this end. Safe to call repeatedly; the close callback fires
    /// at most once even when racing a peer-initiated close.
    pub fn close(&self) {
        let id = match self.inner.state.lock().transport_id.take() {
            Some(id) => id,
            None => return,
        };
        self.inner.ctx.transport.close(id);
        self.inner.invoke_close_callback();
        self.resync_liveness();
        debug!(%id, "message port closed");
    }

    /// Registers the callback invoked once on clean close (local or peer).
    pub fn set_on_close(&self, callback: impl FnOnce() + Send + 'static) {
        self.inner.state.lock().on_close = Some(Box::new(callback));
    }

    /// Registers a "message" listener. The first one starts the receive
    /// loop; each registration counts toward process liveness until removed
    /// or the port is unref'd.
    pub fn on_message(&self, listener: impl Fn(MessageEvent) + Send + Sync + 'static) -> ListenerId {
        let id = {
            let mut state = self.inner.state.lock();
            let id = state.alloc_listener_id();
            state.message_listeners.push((id, Arc::new(listener)));
            id
        };
        self.resync_liveness();
        self.start();
        id
    }

    /// Registers a "messageerror" listener. No loop or liveness side
    /// effects.
    pub fn on_message_error(
        &self,
        listener: impl Fn(MessageErrorEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let mut state = self.inner.state.lock();
        let id = state.alloc_listener_id();
        state.message_error_listeners.push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener of either kind; false if unknown.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            let before = state.message_listeners.len() + state.message_error_listeners.len();
            state.message_listeners.retain(|(lid, _)| *lid != id);
            state.message_error_listeners.retain(|(lid, _)| *lid != id);
            before != state.message_listeners.len() + state.message_error_listeners.len()
        };
        if removed {
            self.resync_liveness();
        }
        removed
    }

    /// Stops counting this port's listeners toward process liveness.
    pub fn unref(&self) {
        self.inner.state.lock().unrefed = true;
        self.resync_liveness();
    }

    /// Resumes counting this port's listeners toward process liveness.
    pub fn keep_alive(&self) {
        self.inner.state.lock().unrefed = false;
        self.resync_liveness();
    }

    /// True while this port contributes to process liveness.
    pub fn refed(&self) -> bool {
        self.inner.state.lock().contributed > 0
    }

    /// Pops one queued message without going through the event loop.
    ///
    /// Returns `Ok(None)` when the port is closed or no message is queued.
    /// A live receive loop is interrupted with the one-shot pending flag so
    /// it re-arms instead of terminating.
    pub fn receive_message(&self) -> Result<Option<MessageEvent>, ChannelError> {
        let (id, enabled) = {
            let state = self.inner.state.lock();
            match state.transport_id {
                Some(id) => (id, state.enabled),
                None => return Ok(None),
            }
        };
        if enabled {
            self.inner.state.lock().pending_interrupt = true;
            self.inner.ctx.transport.interrupt(id);
        }
        let envelope = match self.inner.ctx.transport.try_recv(id)? {
            Some(envelope) => envelope,
            None => return Ok(None),
        };
        let (data, transferred) = decode_message(envelope, &self.inner.ctx)?;
        Ok(Some(MessageEvent::new(data, transferred)))
    }

    /// True once closed or transferred away.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().transport_id.is_none()
    }

    /// True while the receive loop task is active.
    pub fn is_started(&self) -> bool {
        self.inner.state.lock().enabled
    }

    /// Embeds this port in a value graph; it must also appear in the
    /// transfer list of the post that carries it.
    pub fn as_value(&self) -> Value {
        Value::Host(self.host_ref())
    }

    /// Recovers a port from a received value graph slot.
    pub fn from_value(value: &Value) -> Option<MessagePort> {
        match value {
            Value::Host(host) if host.kind() == PORT_HOST_KIND => host
                .downcast::<PortInner>()
                .map(|inner| MessagePort { inner }),
            _ => None,
        }
    }

    /// Endpoint identity; equal across clones of the same port.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    pub(crate) fn host_ref(&self) -> HostRef {
        HostRef::new(
            PORT_HOST_KIND,
            Arc::clone(&self.inner) as Arc<dyn Any + Send + Sync>,
        )
    }

    pub(crate) fn context(&self) -> &ChannelContext {
        &self.inner.ctx
    }

    /// Captures the transport id for an outgoing transfer, invalidating
    /// this handle. Returns the id and whether a loop was running.
    pub(crate) fn take_for_transfer(&self) -> Option<(PortId, bool)> {
        let taken = {
            let mut state = self.inner.state.lock();
            state.transport_id.take().map(|id| (id, state.enabled))
        };
        if taken.is_some() {
            self.resync_liveness();
        }
        taken
    }

    /// Reconciles this port's liveness contribution with its listener count,
    /// unref state and lifecycle. A closed or transferred-away port can
    /// receive no further messages, so it contributes nothing.
    fn resync_liveness(&self) {
        let mut state = self.inner.state.lock();
        let target = if state.unrefed || state.transport_id.is_none() {
            0
        } else {
            state.message_listeners.len()
        };
        while state.contributed < target {
            self.inner.ctx.liveness.incr();
            state.contributed += 1;
        }
        while state.contributed > target {
            self.inner.ctx.liveness.decr();
            state.contributed -= 1;
        }
    }
}

impl std::fmt::Debug for MessagePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("MessagePort")
            .field("transport_id", &state.transport_id)
            .field("enabled", &state.enabled)
            .field("listeners", &state.message_listeners.len())
            .finish()
    }
}

impl PortInner {
    fn dispatch_message(&self, event: MessageEvent) {
        let listeners: Vec<MessageListener> = self
            .state
            .lock()
            .message_listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    fn dispatch_message_error(&self, event: MessageErrorEvent) {
        let listeners: Vec<MessageErrorListener> = self
            .state
            .lock()
            .message_error_listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    pub(crate) fn invoke_close_callback(&self) {
        let callback = {
            let mut state = self.state.lock();
            if state.close_invoked {
                None
            } else {
                state.close_invoked = true;
                state.on_close.take()
            }
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

fn spawn_receive_loop(inner: Arc<PortInner>) {
    tokio::spawn(async move {
        let result = receive_loop(&inner).await;
        inner.state.lock().enabled = false;
        if let Err(err) = result {
            // Fatal transport failure: surfaced here, never retried.
            error!(error = %err, "message port receive loop failed");
        }
    });
}

async fn receive_loop(inner: &Arc<PortInner>) -> Result<(), TransportError> {
    loop {
        let id = match inner.state.lock().transport_id {
            Some(id) => id,
            None => break,
        };
        match inner.ctx.transport.recv(id).await {
            Ok(Received::Envelope(envelope)) => match decode_message(envelope, &inner.ctx) {
                Ok((data, transferred)) => {
                    trace!(%id, "dispatching message event");
                    inner.dispatch_message(MessageEvent::new(data, transferred));
                }
                Err(err) => {
                    debug!(%id, error = %err, "undecodable envelope ends delivery on this port");
                    inner.dispatch_message_error(MessageErrorEvent { error: err });
                    break;
                }
            },
            Ok(Received::Closed) => {
                inner.invoke_close_callback();
                break;
            }
            Ok(Received::Interrupted) => {
                let resume = {
                    let mut state = inner.state.lock();
                    std::mem::take(&mut state.pending_interrupt)
                };
                if resume {
                    continue;
                }
                break;
            }
            Err(err) => {
                inner.invoke_close_callback();
                return Err(err);
            }
        }
    }
    Ok(())
}
