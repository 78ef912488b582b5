//! Channel factory: one entangled pair per call.

use crate::context::ChannelContext;
use crate::port::MessagePort;

/// Two ports created together and always entangled to each other. The pair
/// is immutable after construction; the ports themselves carry all state.
#[derive(Debug)]
pub struct MessageChannel {
    pub port1: MessagePort,
    pub port2: MessagePort,
}

impl MessageChannel {
    pub fn new(ctx: &ChannelContext) -> Self {
        let (a, b) = ctx.transport.create_entangled();
        Self {
            port1: MessagePort::new(a, ctx.clone()),
            port2: MessagePort::new(b, ctx.clone()),
        }
    }

    pub fn into_ports(self) -> (MessagePort, MessagePort) {
        (self.port1, self.port2)
    }
}
