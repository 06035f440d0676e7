//! The edge agent: signs calls and dispatches them to edge nodes.
//!
//! Each call is one exchange: take the next nonce for the node, sign the
//! envelope, hand it to the transport, return what came back. Nothing is
//! retried here; see [`crate::redo`] for the caller-side redo loop.

use crate::nonce::{origin_from_config, ClockOrigin, NonceCache, NonceOrigin};
use edgecall_types::config::MAINNET_ID;
use edgecall_types::{AgentConfig, CallKind, CallResult, EdgeError, EdgeResult, Method, NodeId};
use edgecall_wire::{
    sign_request, Identity, PublicIdentity, RequestFields, RequestSigner, Transport,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Signs and dispatches calls to edge nodes on behalf of one identity.
///
/// The agent exclusively owns its signing identity and nonce cache. Any
/// number of calls may run concurrently through a shared reference.
pub struct Agent {
    signer: Box<dyn RequestSigner>,
    transport: Arc<dyn Transport>,
    nonces: NonceCache,
    network_id: u64,
}

impl Agent {
    /// Create an agent for the main network.
    ///
    /// Sequences start at the current Unix time in milliseconds, so a
    /// sequence restarted by [`Agent::disable_nonce_cache`] begins above the
    /// values already sent. Use [`Agent::with_origin`] to pick another origin.
    pub fn new(identity: Identity, transport: impl Transport) -> Self {
        Self::with_parts(
            Box::new(identity),
            Arc::new(transport),
            Arc::new(ClockOrigin),
            MAINNET_ID,
        )
    }

    /// Create an agent from configuration, loading the key from `key_file`.
    pub fn from_config(config: &AgentConfig, transport: impl Transport) -> EdgeResult<Self> {
        let key_file = config.key_file.as_deref().ok_or_else(|| {
            EdgeError::Construction("no key_file configured for the agent".to_string())
        })?;
        let identity = Identity::load(key_file)?;
        Ok(Self::with_config(config, identity, transport))
    }

    /// Create an agent from configuration with an explicit signer.
    pub fn with_config(
        config: &AgentConfig,
        signer: impl RequestSigner + 'static,
        transport: impl Transport,
    ) -> Self {
        Self::with_parts(
            Box::new(signer),
            Arc::new(transport),
            origin_from_config(&config.nonce),
            config.network_id,
        )
    }

    /// Create an agent from its individual parts.
    pub fn with_parts(
        signer: Box<dyn RequestSigner>,
        transport: Arc<dyn Transport>,
        origin: Arc<dyn NonceOrigin>,
        network_id: u64,
    ) -> Self {
        let agent = Self {
            signer,
            transport,
            nonces: NonceCache::new(origin),
            network_id,
        };
        info!(
            identity = %agent.public_identity(),
            network_id,
            "edge agent ready"
        );
        agent
    }

    /// Replace the nonce origin. Drops any cached sequences.
    pub fn with_origin(mut self, origin: Arc<dyn NonceOrigin>) -> Self {
        self.nonces = NonceCache::new(origin);
        self
    }

    /// Public identity the agent's signatures verify under.
    pub fn public_identity(&self) -> PublicIdentity {
        self.signer.public_identity()
    }

    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    pub fn nonce_cache(&self) -> &NonceCache {
        &self.nonces
    }

    /// Probe a node with a lightweight signed info call.
    ///
    /// Succeeds whenever the node is reachable and accepts the signature,
    /// even if its application is idle.
    pub async fn probe(&self, node: &NodeId) -> EdgeResult<CallResult> {
        self.dispatch(node, CallKind::Info, "", "", Method::Get).await
    }

    /// Call an application path on a node.
    ///
    /// Returns `Err` only when the call did not reach the application (or
    /// could not be signed). An error reported by the application itself is
    /// returned as `Ok` with [`CallResult::err`] populated.
    pub async fn call_api(
        &self,
        node: &NodeId,
        path: &str,
        body: &str,
        method: Method,
    ) -> EdgeResult<CallResult> {
        if !path.starts_with('/') {
            return Err(EdgeError::InvalidInput(format!(
                "api path must start with '/': {path:?}"
            )));
        }
        self.dispatch(node, CallKind::Api, path, body, method).await
    }

    /// Forget every cached nonce sequence.
    ///
    /// Call this after a dispatch failure that may come from a stale or
    /// rejected nonce, before trying again.
    pub fn disable_nonce_cache(&self) {
        self.nonces.invalidate_all();
    }

    /// Forget the cached nonce sequence of one node.
    pub fn invalidate_node(&self, node: &NodeId) {
        self.nonces.invalidate(node);
    }

    async fn dispatch(
        &self,
        node: &NodeId,
        kind: CallKind,
        path: &str,
        body: &str,
        method: Method,
    ) -> EdgeResult<CallResult> {
        let nonce = self.nonces.next_nonce(node).await?;

        let fields = RequestFields {
            network_id: self.network_id,
            node: node.clone(),
            kind,
            path: path.to_string(),
            method,
            body: body.to_string(),
            nonce,
        };
        let request = sign_request(self.signer.as_ref(), &fields).map_err(|e| {
            warn!(node = %node, nonce, error = %e, "failed to sign request");
            EdgeError::from(e)
        })?;

        let request_id = request.digest();
        debug!(
            node = %node,
            kind = kind.as_str(),
            %method,
            path,
            nonce,
            request = %request_id,
            "dispatching signed request"
        );

        match self.transport.send(&request).await {
            Ok(result) => {
                if let Some(app_err) = result.application_error() {
                    info!(
                        node = %node,
                        path,
                        hash = %result.correlation_hash,
                        error = app_err,
                        "edge application reported an error"
                    );
                } else {
                    debug!(node = %node, hash = %result.correlation_hash, "call completed");
                }
                Ok(result)
            }
            Err(e) => {
                warn!(
                    node = %node,
                    nonce,
                    request = %request_id,
                    error = %e,
                    "dispatch failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::BaselineOrigin;
    use async_trait::async_trait;
    use edgecall_types::{SigningError, TransportError};
    use edgecall_wire::{MemoryTransport, ScriptedReply, Signature, SignedRequest};
    use std::time::Duration;

    const TEST_KEY_HEX: &str = "03b7dfc824b0cbcfe789ec0ce4571f3460befd0490e3d0d2aad8e3c07dbcce14";

    fn node(id: &str) -> NodeId {
        NodeId::new(id).unwrap()
    }

    fn identity() -> Identity {
        Identity::from_key_bytes(TEST_KEY_HEX.as_bytes()).unwrap()
    }

    struct LockedSigner(PublicIdentity);

    impl RequestSigner for LockedSigner {
        fn public_identity(&self) -> PublicIdentity {
            self.0
        }

        fn sign_bytes(&self, _message: &[u8]) -> Result<Signature, SigningError> {
            Err(SigningError::KeyUnavailable("signer locked".to_string()))
        }
    }

    struct SlowTransport;

    #[async_trait]
    impl Transport for SlowTransport {
        async fn send(&self, _request: &SignedRequest) -> Result<CallResult, TransportError> {
            Err(TransportError::Timeout(Duration::from_secs(30)))
        }
    }

    #[tokio::test]
    async fn test_probe_sends_signed_info_envelope() {
        let transport = Arc::new(MemoryTransport::with_default(ScriptedReply::Result(
            CallResult::ok("abc", "{}"),
        )));
        let agent = Agent::new(identity(), transport.clone());

        let result = agent.probe(&node("node-1")).await.unwrap();
        assert_eq!(result.correlation_hash, "abc");
        assert!(result.is_ok());

        let sent = transport.received();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind(), CallKind::Info);
        assert_eq!(sent[0].body(), "");
        assert_eq!(sent[0].signer(), &agent.public_identity());
        assert_eq!(sent[0].network_id(), MAINNET_ID);
    }

    #[tokio::test]
    async fn test_call_api_advances_nonce_per_node() {
        let transport = Arc::new(MemoryTransport::with_default(ScriptedReply::Result(
            CallResult::ok("", "[]"),
        )));
        let agent =
            Agent::new(identity(), transport.clone()).with_origin(Arc::new(BaselineOrigin(0)));
        let (a, b) = (node("node-a"), node("node-b"));

        for (n, path, body, method) in [
            (&a, "/sdapi/v1/sd-models", "{}", Method::Get),
            (&a, "/sdapi/v1/sd-models", "{}", Method::Get),
            (&b, "/sdapi/v1/txt2img", "{\"steps\":50}", Method::Post),
        ] {
            agent.call_api(n, path, body, method).await.unwrap();
        }

        let nonces: Vec<(String, u64)> = transport
            .received()
            .iter()
            .map(|r| (r.node().to_string(), r.nonce()))
            .collect();
        assert_eq!(
            nonces,
            vec![
                ("node-a".to_string(), 0),
                ("node-a".to_string(), 1),
                ("node-b".to_string(), 0)
            ]
        );
    }

    #[tokio::test]
    async fn test_application_error_is_data() {
        let transport = MemoryTransport::with_default(ScriptedReply::Result(CallResult::app_error(
            "h-1",
            "model not loaded",
        )));
        let agent = Agent::new(identity(), transport);

        let result = agent
            .call_api(&node("node-1"), "/sdapi/v1/txt2img", "{}", Method::Post)
            .await
            .unwrap();
        assert_eq!(result.application_error(), Some("model not loaded"));
        assert_eq!(result.correlation_hash, "h-1");
    }

    #[tokio::test]
    async fn test_transport_failure_is_error() {
        let agent = Agent::new(identity(), MemoryTransport::new());
        let err = agent.probe(&node("nowhere")).await.unwrap_err();
        assert!(matches!(err, EdgeError::Transport(TransportError::Unreachable(_))));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_timeout_stays_distinct() {
        let agent = Agent::new(identity(), SlowTransport);
        let err = agent.probe(&node("node-1")).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_signing_failure_propagates() {
        let transport = Arc::new(MemoryTransport::with_default(ScriptedReply::Result(
            CallResult::ok("h", ""),
        )));
        let signer = LockedSigner(*identity().public());
        let agent = Agent::with_config(&AgentConfig::default(), signer, transport.clone());

        let err = agent.probe(&node("node-1")).await.unwrap_err();
        assert!(matches!(err, EdgeError::Signing(SigningError::KeyUnavailable(_))));
        assert!(!err.is_retryable());
        assert!(transport.received().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_relative_path() {
        let agent = Agent::new(identity(), MemoryTransport::new());
        let err = agent
            .call_api(&node("node-1"), "sdapi/v1/sd-models", "{}", Method::Get)
            .await
            .unwrap_err();
        assert!(matches!(err, EdgeError::InvalidInput(_)));
        assert!(agent.nonce_cache().is_empty());
    }

    #[tokio::test]
    async fn test_disable_nonce_cache_restarts_sequence() {
        let transport = Arc::new(MemoryTransport::with_default(ScriptedReply::Result(
            CallResult::ok("h", ""),
        )));
        let agent =
            Agent::new(identity(), transport.clone()).with_origin(Arc::new(BaselineOrigin(100)));
        let n = node("node-1");

        agent.probe(&n).await.unwrap();
        agent.probe(&n).await.unwrap();
        agent.disable_nonce_cache();
        agent.probe(&n).await.unwrap();

        let nonces: Vec<u64> = transport.received().iter().map(|r| r.nonce()).collect();
        assert_eq!(nonces, vec![100, 101, 100]);
    }

    #[tokio::test]
    async fn test_config_network_is_signed() {
        let transport = Arc::new(MemoryTransport::with_default(ScriptedReply::Result(
            CallResult::ok("h", ""),
        )));
        let config = AgentConfig {
            network_id: edgecall_types::config::TESTNET_ID,
            ..AgentConfig::default()
        };
        let agent = Agent::with_config(&config, identity(), transport.clone());
        agent.probe(&node("node-1")).await.unwrap();
        assert_eq!(transport.received()[0].network_id(), edgecall_types::config::TESTNET_ID);
    }

    #[test]
    fn test_from_config_requires_key_file() {
        let result = Agent::from_config(&AgentConfig::default(), MemoryTransport::new());
        assert!(matches!(result, Err(EdgeError::Construction(_))));
    }

    #[test]
    fn test_independent_agents() {
        let a = Agent::new(Identity::generate(), MemoryTransport::new());
        let b = Agent::new(Identity::generate(), MemoryTransport::new());
        assert_ne!(a.public_identity(), b.public_identity());
    }

    #[tokio::test]
    async fn test_default_origin_restarts_above_sent_values() {
        let transport = Arc::new(MemoryTransport::with_default(ScriptedReply::Result(
            CallResult::ok("h", ""),
        )));
        let agent = Agent::new(identity(), transport.clone());
        let n = node("node-1");
        let before = chrono::Utc::now().timestamp_millis() as u64;

        agent.probe(&n).await.unwrap();
        agent.probe(&n).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        agent.disable_nonce_cache();
        agent.probe(&n).await.unwrap();

        let nonces: Vec<u64> = transport.received().iter().map(|r| r.nonce()).collect();
        assert!(nonces[0] >= before);
        assert_eq!(nonces[1], nonces[0] + 1);
        assert!(nonces[2] > nonces[1]);
    }

    #[tokio::test]
    async fn test_exhausted_baseline_stops_sending() {
        let transport = Arc::new(MemoryTransport::with_default(ScriptedReply::Result(
            CallResult::ok("h", ""),
        )));
        let mut config = AgentConfig::default();
        config.nonce.origin = edgecall_types::NonceOriginKind::Baseline;
        config.nonce.baseline = u64::MAX;
        let agent = Agent::with_config(&config, identity(), transport.clone());
        let n = node("node-1");

        agent.probe(&n).await.unwrap();
        for _ in 0..2 {
            let err = agent.probe(&n).await.unwrap_err();
            assert!(matches!(err, EdgeError::Transport(TransportError::NonceExhausted(_))));
            assert!(!err.is_retryable());
        }
        assert_eq!(transport.sent_count(&n), 1);
    }
}
