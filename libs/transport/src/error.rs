//! Transport failure surface.
//!
//! The in-process transport is infallible by construction; these variants
//! exist for the trait seam, where remote or test implementations can fail.
//! Any error returned from `recv` is fatal to the owning receive loop.

use thiserror::Error;

use crate::PortId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint id was never issued by this transport.
    #[error("transport endpoint {0} is not registered")]
    UnknownEndpoint(PortId),

    /// The underlying carrier failed in a way that is not a clean close.
    #[error("transport backend failure: {0}")]
    Backend(String),
}
