//! # Weft Structured Value Types
//!
//! Foundational value model for the weft messaging stack. A [`Value`] is a
//! cheap handle into a possibly-cyclic object graph: lists and maps are
//! reference-counted shared containers, so the same subtree can appear in
//! multiple positions and graphs can contain cycles. The codec and the
//! message-channel layers both operate on this model.
//!
//! ## Design Philosophy
//!
//! - **Handles, not trees**: cloning a `Value` clones an `Arc`, never the
//!   contents. Aliasing and cycles are first-class and survive serialization.
//! - **Identity is explicit**: every shared container exposes `identity()`
//!   (its allocation address) so deduplication and transfer-list matching are
//!   done with visible keys instead of hidden identity tables.
//! - **Ownership transfer is a state, not a convention**: [`SharedBuffer`]
//!   has an explicit detached state; reading a detached buffer is impossible
//!   by construction (accessors return `None`).
//! - **Host objects are tagged**: [`HostRef`] carries a kind tag decided at
//!   the API boundary. Nothing in this crate inspects the payload type.
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{structurally_equal, SharedList, Value};
//!
//! let list = SharedList::new();
//! list.push(Value::Int(1));
//! list.push(Value::Text("two".into()));
//! // A list may contain itself; equality and serialization handle the cycle.
//! list.push(Value::List(list.clone()));
//!
//! let root = Value::List(list);
//! assert!(structurally_equal(&root, &root.clone()));
//! ```

pub mod buffer;
pub mod host;
pub mod value;

pub use buffer::SharedBuffer;
pub use host::HostRef;
pub use value::{structurally_equal, SharedList, SharedMap, Value};
