//! Core types for edgecall, the signed-request dispatch core for edge nodes.
//!
//! This crate defines the shared data structures used by the wire layer and
//! the agent: node identifiers, call shapes, results, configuration and the
//! error taxonomy. It contains no business logic.

pub mod call;
pub mod config;
pub mod error;
pub mod node;
pub mod serde_compat;

pub use call::{ApiRequest, CallKind, CallResult, Method};
pub use config::{AgentConfig, NonceConfig, NonceOriginKind, RedoPolicy};
pub use error::{EdgeError, EdgeResult, SigningError, TransportError};
pub use node::NodeId;
