//! Shared construction context for channels and ports.

use std::sync::Arc;

use transport::{InProcessTransport, Transport};

use crate::liveness::LivenessRegistry;

/// Everything a port needs at construction: the transport that carries its
/// envelopes and the liveness registry it reports its listeners to.
///
/// Ports materialized from an incoming transfer inherit the receiving
/// port's context, which is what binds a transferred endpoint to the local
/// transport and liveness accounting.
#[derive(Debug, Clone)]
pub struct ChannelContext {
    pub transport: Arc<dyn Transport>,
    pub liveness: Arc<LivenessRegistry>,
}

impl ChannelContext {
    /// Wraps an existing transport with a fresh liveness registry.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            liveness: Arc::new(LivenessRegistry::new()),
        }
    }

    /// Context backed by a private in-process transport.
    pub fn in_process() -> Self {
        Self::new(Arc::new(InProcessTransport::new()))
    }
}
