//! Transport port
//!
//! The engine never touches the network itself. Adapters implement
//! [`Transport`] and are handed to the orchestrator.

use async_trait::async_trait;

/// Sends one attempt of a logical request
///
/// Implementations must produce exactly one result per call and must build
/// any per-attempt wire state (buffers, streams, connections) fresh on each
/// call: the same `Request` is replayed for every attempt. A hung send should
/// surface as an `Err` from the adapter's own timeout.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Immutable description of the operation
    type Request: Send + Sync + 'static;
    /// Well-formed reply, which may still signal unavailability
    type Response: Send + Sync + 'static;
    /// Failure to obtain a reply
    type Error: Send + Sync + 'static;

    async fn send(&self, request: &Self::Request) -> Result<Self::Response, Self::Error>;
}
