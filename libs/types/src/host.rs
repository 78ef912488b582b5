//! Opaque host object references.
//!
//! A [`HostRef`] embeds an out-of-band object (a message port, for example)
//! inside a value graph by reference. The codec never inspects the payload;
//! it only matches identities against an explicit positional side-table
//! supplied by the caller. The `kind` tag is decided where the reference is
//! created, keeping type decisions out of the serialization core.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Tagged, reference-counted handle to an arbitrary host object.
#[derive(Clone)]
pub struct HostRef {
    kind: &'static str,
    object: Arc<dyn Any + Send + Sync>,
}

impl HostRef {
    pub fn new(kind: &'static str, object: Arc<dyn Any + Send + Sync>) -> Self {
        Self { kind, object }
    }

    /// Kind tag assigned at construction (e.g. `"message-port"`).
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Identity of the referenced object; equal for clones and for any other
    /// `HostRef` wrapping the same allocation.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.object) as *const () as usize
    }

    /// Attempts to recover the concrete host object.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostRef({} @ {:#x})", self.kind, self.identity())
    }
}
