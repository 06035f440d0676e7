//! The seam between the dispatch core and whatever carries envelopes.
//!
//! Connection handling, addressing, low-level retries and timeouts all live
//! behind this trait. An implementation must report a timeout as
//! [`TransportError::Timeout`] so callers can tell it apart from other
//! failures.

use crate::envelope::SignedRequest;
use async_trait::async_trait;
use edgecall_types::{CallResult, TransportError};
use std::sync::Arc;

/// Delivers a signed envelope to its destination node.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `request` to `request.node()` and wait for the correlated result.
    ///
    /// An application-level failure on the node is a successful exchange:
    /// it comes back as `Ok` with [`CallResult::err`] populated.
    async fn send(&self, request: &SignedRequest) -> Result<CallResult, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &SignedRequest) -> Result<CallResult, TransportError> {
        (**self).send(request).await
    }
}
