//! The structured value graph.
//!
//! Values are handles; [`SharedList`] and [`SharedMap`] are interior-mutable
//! shared containers so a graph can alias subtrees and contain cycles.
//! [`structurally_equal`] is the cycle-safe deep comparison used by the codec
//! round-trip tests.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{HostRef, SharedBuffer};

/// A node handle in a structured value graph.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Binary payload, deep-copied unless listed for transfer.
    Buffer(SharedBuffer),
    List(SharedList),
    Map(SharedMap),
    /// Out-of-band host object, always carried by reference.
    Host(HostRef),
}

impl Value {
    /// Short kind name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Buffer(_) => "buffer",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Host(host) => host.kind(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<SharedBuffer> for Value {
    fn from(v: SharedBuffer) -> Self {
        Value::Buffer(v)
    }
}

impl From<SharedList> for Value {
    fn from(v: SharedList) -> Self {
        Value::List(v)
    }
}

impl From<SharedMap> for Value {
    fn from(v: SharedMap) -> Self {
        Value::Map(v)
    }
}

impl From<HostRef> for Value {
    fn from(v: HostRef) -> Self {
        Value::Host(v)
    }
}

/// Shared, growable sequence of values. Clones alias the same storage.
#[derive(Clone, Default)]
pub struct SharedList(Arc<Mutex<Vec<Value>>>);

impl SharedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self(Arc::new(Mutex::new(values.into_iter().collect())))
    }

    pub fn push(&self, value: Value) {
        self.0.lock().push(value);
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.lock().get(index).cloned()
    }

    /// Replaces the element at `index`; false if out of bounds.
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.0.lock().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Stable identity of the backing allocation.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Runs `f` over the items while holding the container lock.
    pub fn with_items<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        f(&self.0.lock())
    }
}

impl fmt::Debug for SharedList {
    // Never recurse into items: the graph may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedList({:#x})", self.identity())
    }
}

/// Shared string-keyed map of values. Clones alias the same storage.
#[derive(Clone, Default)]
pub struct SharedMap(Arc<Mutex<BTreeMap<String, Value>>>);

impl SharedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self(Arc::new(Mutex::new(entries.into_iter().collect())))
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.lock().insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Stable identity of the backing allocation.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Runs `f` over the entries while holding the container lock.
    pub fn with_entries<R>(&self, f: impl FnOnce(&BTreeMap<String, Value>) -> R) -> R {
        f(&self.0.lock())
    }
}

impl fmt::Debug for SharedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedMap({:#x})", self.identity())
    }
}

/// Deep structural equality over possibly-cyclic graphs.
///
/// Containers compare element-wise; a pair of containers already under
/// comparison higher up the stack is assumed equal, which is what makes
/// cycles terminate. Buffers compare by contents (two detached buffers are
/// equal), host references by identity, floats bitwise with NaN == NaN.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    let mut in_progress = HashSet::new();
    eq_values(a, b, &mut in_progress)
}

fn eq_values(a: &Value, b: &Value, in_progress: &mut HashSet<(usize, usize)>) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::Text(x), Value::Text(y)) => x == y,
        (Value::Buffer(x), Value::Buffer(y)) => match (x.snapshot(), y.snapshot()) {
            (Some(xs), Some(ys)) => xs == ys,
            (None, None) => true,
            _ => false,
        },
        (Value::Host(x), Value::Host(y)) => x.identity() == y.identity(),
        (Value::List(x), Value::List(y)) => {
            if x.identity() == y.identity() || !in_progress.insert((x.identity(), y.identity())) {
                return true;
            }
            // Clone the child handles out before recursing: a graph can hold
            // x inside y and y inside x, and the locks are not reentrant.
            let xs = x.with_items(|items| items.to_vec());
            let ys = y.with_items(|items| items.to_vec());
            xs.len() == ys.len() && xs.iter().zip(&ys).all(|(u, v)| eq_values(u, v, in_progress))
        }
        (Value::Map(x), Value::Map(y)) => {
            if x.identity() == y.identity() || !in_progress.insert((x.identity(), y.identity())) {
                return true;
            }
            let xs = x.with_entries(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>()
            });
            let ys = y.with_entries(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Vec<_>>()
            });
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(&ys)
                    .all(|((ka, va), (kb, vb))| ka == kb && eq_values(va, vb, in_progress))
        }
        _ => false,
    }
}
