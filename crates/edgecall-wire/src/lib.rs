//! edgecall wire layer: identity, canonical envelope and the transport seam.
//!
//! ## Architecture
//!
//! - **Identity**: the agent's Ed25519 key pair and its public identity
//! - **SignedRequest**: canonical envelope plus a signature over it
//! - **Transport**: trait for delivering envelopes to edge nodes
//! - **MemoryTransport**: scripted in-process transport for tests and demos

pub mod envelope;
pub mod identity;
pub mod memory;
pub mod transport;

pub use envelope::{sign_request, RequestFields, SignedRequest};
pub use identity::{Identity, PublicIdentity, RequestSigner};
pub use memory::{MemoryTransport, ScriptedReply};
pub use transport::Transport;

pub use ed25519_dalek::Signature;
