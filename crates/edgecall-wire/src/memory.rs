//! In-process scripted transport.
//!
//! [`MemoryTransport`] stands in for a real RPC client: replies are scripted
//! per node (consumed in order) with an optional default for everything else.
//! Every envelope is signature-checked before it is accepted, and accepted
//! envelopes are recorded for inspection.

use crate::envelope::SignedRequest;
use crate::transport::Transport;
use async_trait::async_trait;
use edgecall_types::{CallResult, NodeId, TransportError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;

/// One scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedReply {
    /// The node answers with this result. An empty correlation hash is
    /// replaced with the envelope digest.
    Result(CallResult),
    /// The exchange fails with this transport error.
    Fail(TransportError),
}

/// Scripted in-memory [`Transport`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    scripts: Mutex<HashMap<NodeId, VecDeque<ScriptedReply>>>,
    default_reply: Option<ScriptedReply>,
    received: Mutex<Vec<SignedRequest>>,
}

impl MemoryTransport {
    /// A transport with no scripts: every node is unreachable.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that answers `reply` whenever no script is queued.
    pub fn with_default(reply: ScriptedReply) -> Self {
        Self {
            default_reply: Some(reply),
            ..Self::default()
        }
    }

    /// Queue `reply` for the next unscripted call to `node`.
    pub fn script(&self, node: &NodeId, reply: ScriptedReply) {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts.entry(node.clone()).or_default().push_back(reply);
    }

    /// Snapshot of every envelope that passed signature verification.
    pub fn received(&self) -> Vec<SignedRequest> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of accepted envelopes addressed to `node`.
    pub fn sent_count(&self, node: &NodeId) -> usize {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.node() == node)
            .count()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, request: &SignedRequest) -> Result<CallResult, TransportError> {
        if let Err(reason) = request.verify() {
            debug!(node = %request.node(), %reason, "memory transport: rejecting envelope");
            return Err(TransportError::Rejected(reason));
        }

        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let scripted = {
            let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
            scripts
                .get_mut(request.node())
                .and_then(|queue| queue.pop_front())
        };

        match scripted.or_else(|| self.default_reply.clone()) {
            Some(ScriptedReply::Result(mut result)) => {
                if result.correlation_hash.is_empty() {
                    result.correlation_hash = request.digest();
                }
                Ok(result)
            }
            Some(ScriptedReply::Fail(err)) => Err(err),
            None => Err(TransportError::Unreachable(request.node().to_string())),
        }
    }
}
