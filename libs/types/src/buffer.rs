//! Detachable binary buffers.
//!
//! A [`SharedBuffer`] is the transferable binary payload of the value model.
//! Transferring one moves its backing storage to the receiving side and
//! leaves the source *detached*: zero-length, unreadable, unwritable. All
//! accessors surface that state as `None` rather than panicking, so a stale
//! handle held after a transfer is inert instead of dangerous.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Reference-counted byte buffer with an explicit detached state.
///
/// Clones share the same backing storage; detaching through any clone
/// detaches all of them at once.
#[derive(Clone)]
pub struct SharedBuffer(Arc<Mutex<BufferState>>);

enum BufferState {
    Attached(Vec<u8>),
    Detached,
}

impl SharedBuffer {
    /// Creates a buffer owning `data`.
    pub fn new(data: Vec<u8>) -> Self {
        Self(Arc::new(Mutex::new(BufferState::Attached(data))))
    }

    /// Creates a buffer with a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::new(data.to_vec())
    }

    /// Creates a zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0; len])
    }

    /// Current length in bytes; a detached buffer reports zero.
    pub fn len(&self) -> usize {
        match &*self.0.lock() {
            BufferState::Attached(data) => data.len(),
            BufferState::Detached => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the backing storage has been moved away.
    pub fn is_detached(&self) -> bool {
        matches!(&*self.0.lock(), BufferState::Detached)
    }

    /// Copies the current contents, or `None` if detached.
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        match &*self.0.lock() {
            BufferState::Attached(data) => Some(data.clone()),
            BufferState::Detached => None,
        }
    }

    /// Takes the backing storage, leaving the buffer detached.
    ///
    /// Returns `None` if the buffer was already detached; detaching is a
    /// one-shot operation across all clones of the handle.
    pub fn detach(&self) -> Option<Vec<u8>> {
        let mut state = self.0.lock();
        match std::mem::replace(&mut *state, BufferState::Detached) {
            BufferState::Attached(data) => Some(data),
            BufferState::Detached => None,
        }
    }

    /// Runs `f` over the contents; `None` if detached.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        match &*self.0.lock() {
            BufferState::Attached(data) => Some(f(data)),
            BufferState::Detached => None,
        }
    }

    /// Runs `f` over the contents mutably; `None` if detached.
    pub fn with_bytes_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        match &mut *self.0.lock() {
            BufferState::Attached(data) => Some(f(data)),
            BufferState::Detached => None,
        }
    }

    /// Stable identity of the backing allocation, shared by all clones.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0.lock() {
            BufferState::Attached(data) => {
                write!(f, "SharedBuffer({} bytes @ {:#x})", data.len(), self.identity())
            }
            BufferState::Detached => write!(f, "SharedBuffer(detached @ {:#x})", self.identity()),
        }
    }
}
