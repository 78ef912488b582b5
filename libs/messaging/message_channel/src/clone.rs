//! Structured clone: serialize then immediately deserialize, no transport
//! hop. The correctness baseline for the transfer codec — a clone is a deep
//! copy of the value with the transfer list moved.

use types::Value;

use crate::context::ChannelContext;
use crate::error::ChannelError;
use crate::transfer::{decode_message, encode_message, TransferEntry};

/// Options for [`structured_clone`]. A plain transfer list converts
/// directly.
#[derive(Debug, Default)]
pub struct StructuredCloneOptions {
    pub transfer: Vec<TransferEntry>,
}

impl From<Vec<TransferEntry>> for StructuredCloneOptions {
    fn from(transfer: Vec<TransferEntry>) -> Self {
        Self { transfer }
    }
}

/// Deep-copies `value`, moving the listed transferables into the copy.
///
/// Transferred buffers leave their source detached; transferred ports are
/// rebound to brand-new local ports, reachable through the returned graph
/// via [`crate::MessagePort::from_value`]. The context supplies the
/// transport those rebound ports attach to.
pub fn structured_clone(
    value: &Value,
    options: impl Into<StructuredCloneOptions>,
    ctx: &ChannelContext,
) -> Result<Value, ChannelError> {
    let options = options.into();
    let envelope = encode_message(value, &options.transfer, None)?;
    let (clone, _transferred) = decode_message(envelope, ctx)?;
    Ok(clone)
}
