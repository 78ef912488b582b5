//! # Weft Message Channels
//!
//! Two entangled [`MessagePort`]s exchanging structured values, with
//! ownership transfer of binary buffers and of ports themselves, plus a
//! [`structured_clone`] deep-copy built on the same machinery.
//!
//! ## Architecture Role
//!
//! ```text
//! caller → MessageChannel::new() → (port1, port2) entangled via Transport
//!    port1.post_message_with(value, transfer)
//!        → transfer codec: serialize + lift transferables → Envelope
//!        → Transport::post
//!    port2 receive loop → Transport::recv → decode → "message" event
//! ```
//!
//! ## Ownership rules
//!
//! - A buffer listed for transfer is detached the moment serialization
//!   commits, before any transport interaction; the stale handle reads as
//!   zero-length everywhere.
//! - A port listed for transfer is invalidated synchronously inside
//!   `post_message`: once the call returns, local `post`/`close` on it are
//!   silent no-ops, whether or not the envelope is ever delivered.
//! - Posting on a closed or transferred-away port is not an error; the
//!   envelope is silently dropped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use message_channel::{ChannelContext, MessageChannel};
//! use types::{SharedMap, Value};
//!
//! # #[tokio::main] async fn main() -> Result<(), message_channel::ChannelError> {
//! let ctx = ChannelContext::in_process();
//! let channel = MessageChannel::new(&ctx);
//!
//! channel.port2.on_message(|event| {
//!     println!("got {:?}", event.data);
//! });
//!
//! let map = SharedMap::new();
//! map.insert("a", Value::Int(1));
//! channel.port1.post_message(&Value::Map(map))?;
//! # Ok(()) }
//! ```

pub mod channel;
pub mod clone;
pub mod context;
pub mod error;
pub mod event;
pub mod liveness;
pub mod port;
pub mod transfer;

pub use channel::MessageChannel;
pub use clone::{structured_clone, StructuredCloneOptions};
pub use context::ChannelContext;
pub use error::{ChannelError, DataCloneError, MessageDeliveryError};
pub use event::{MessageErrorEvent, MessageEvent};
pub use liveness::LivenessRegistry;
pub use port::{ListenerId, MessagePort, PostMessageOptions};
pub use transfer::{TransferEntry, TransferredObject};
