//! Error taxonomy for the edgecall dispatch core.
//!
//! Application-level failures reported by an edge node are not errors here:
//! they travel as data inside [`crate::CallResult`].

use std::time::Duration;
use thiserror::Error;

/// Failure to produce a signed envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// The signer's key material is missing or unusable.
    #[error("Key material unavailable: {0}")]
    KeyUnavailable(String),

    /// A field cannot be length-prefixed in the canonical encoding.
    #[error("Envelope field '{field}' too large: {size} bytes")]
    FieldTooLarge {
        /// Name of the oversized field.
        field: &'static str,
        /// Its length in bytes.
        size: usize,
    },

    /// The signature backend refused to sign.
    #[error("Signature backend error: {0}")]
    Backend(String),
}

/// Failure to deliver a request to, or read a response from, an edge node.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The destination could not be reached.
    #[error("Node unreachable: {0}")]
    Unreachable(String),

    /// The exchange did not complete in time.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The transport or the node refused the envelope (bad signature, stale nonce).
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The node answered with something that is not a call result.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The connection closed before a response arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The node's nonce sequence reached `u64::MAX`; nothing was sent.
    #[error("Nonce sequence exhausted for node {0}")]
    NonceExhausted(String),
}

/// Top-level error type for agent operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EdgeError {
    /// Invalid key material or settings while building an agent.
    #[error("Construction error: {0}")]
    Construction(String),

    /// A configuration file could not be used.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A caller-supplied value was rejected at the boundary.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The envelope for this attempt could not be signed.
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// The call never reached the application on the node.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl EdgeError {
    /// Whether a caller-side redo may help.
    ///
    /// Only transport failures qualify. Signing and construction failures are
    /// deterministic for the same inputs, and an exhausted nonce sequence
    /// would only restart at a value already used.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EdgeError::Transport(e) if !matches!(e, TransportError::NonceExhausted(_)))
    }

    /// Whether this is a transport-level timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EdgeError::Transport(TransportError::Timeout(_)))
    }
}

/// Alias for Result with EdgeError.
pub type EdgeResult<T> = Result<T, EdgeError>;
