//! Per-node nonce cache.
//!
//! Each destination node gets its own sequence, held in a slot behind its own
//! async mutex. The slots live in a `DashMap`, so issuing for one node never
//! waits on another node's slot, while two callers for the same node are
//! serialized on that node's slot and can never see the same value.
//!
//! A slot starts empty. The first issuance asks the [`NonceOrigin`] where the
//! sequence begins; later issuances continue from the cached value.
//! Invalidation drops slots, so the next issuance consults the origin again
//! instead of continuing a sequence the node may have rejected.

use async_trait::async_trait;
use dashmap::DashMap;
use edgecall_types::{NodeId, NonceConfig, NonceOriginKind, TransportError};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Source of the first nonce of a fresh sequence.
#[async_trait]
pub trait NonceOrigin: Send + Sync + 'static {
    /// Where the sequence for `node` starts.
    ///
    /// Origins that ask the node itself report failures as transport errors.
    async fn initial_nonce(&self, node: &NodeId) -> Result<u64, TransportError>;
}

/// Every sequence starts at the same fixed value.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineOrigin(pub u64);

#[async_trait]
impl NonceOrigin for BaselineOrigin {
    async fn initial_nonce(&self, _node: &NodeId) -> Result<u64, TransportError> {
        Ok(self.0)
    }
}

/// Sequences start at the current Unix time in milliseconds.
///
/// A sequence rebuilt after invalidation therefore starts above anything
/// issued before, as long as fewer than one nonce per millisecond was used.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockOrigin;

#[async_trait]
impl NonceOrigin for ClockOrigin {
    async fn initial_nonce(&self, _node: &NodeId) -> Result<u64, TransportError> {
        Ok(chrono::Utc::now().timestamp_millis().max(0) as u64)
    }
}

/// Build the origin selected in the configuration.
pub fn origin_from_config(config: &NonceConfig) -> Arc<dyn NonceOrigin> {
    match config.origin {
        NonceOriginKind::Baseline => Arc::new(BaselineOrigin(config.baseline)),
        NonceOriginKind::Clock => Arc::new(ClockOrigin),
    }
}

/// Sequence state of one node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Sequence {
    /// Not yet started; the origin decides the first value.
    #[default]
    Fresh,
    /// The value the next issuance returns.
    Next(u64),
    /// `u64::MAX` was issued. Only invalidation restarts the sequence.
    Exhausted,
}

type Slot = Arc<Mutex<Sequence>>;

/// What [`NonceCache::peek`] saw in a node's slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No cached sequence; the next issuance consults the origin.
    Uninitialised,
    /// The next issuance returns this value.
    Next(u64),
    /// The sequence ran out; issuance fails until the node is invalidated.
    Exhausted,
    /// An issuance for the node is in progress.
    Busy,
}

/// Thread-safe per-node nonce sequences.
pub struct NonceCache {
    slots: DashMap<NodeId, Slot>,
    origin: Arc<dyn NonceOrigin>,
}

impl NonceCache {
    pub fn new(origin: Arc<dyn NonceOrigin>) -> Self {
        Self {
            slots: DashMap::new(),
            origin,
        }
    }

    /// Issue the next nonce for `node`.
    ///
    /// Initialises the node's sequence from the origin on first use (or after
    /// invalidation). If the origin fails, the slot stays uninitialised and
    /// the next call tries again. Once `u64::MAX` has been issued, every
    /// further call fails with [`TransportError::NonceExhausted`] until the
    /// node is invalidated.
    pub async fn next_nonce(&self, node: &NodeId) -> Result<u64, TransportError> {
        // Clone the slot out so the map shard is not held across the await.
        let slot = {
            let entry = self.slots.entry(node.clone()).or_default();
            Arc::clone(entry.value())
        };

        let mut seq = slot.lock().await;
        let nonce = match *seq {
            Sequence::Next(n) => n,
            Sequence::Fresh => {
                let start = self.origin.initial_nonce(node).await?;
                debug!(node = %node, start, "nonce sequence initialised");
                start
            }
            Sequence::Exhausted => {
                warn!(node = %node, "nonce sequence exhausted");
                return Err(TransportError::NonceExhausted(node.to_string()));
            }
        };
        *seq = match nonce.checked_add(1) {
            Some(next) => Sequence::Next(next),
            None => Sequence::Exhausted,
        };
        Ok(nonce)
    }

    /// Drop the cached sequence for one node.
    pub fn invalidate(&self, node: &NodeId) {
        if self.slots.remove(node).is_some() {
            debug!(node = %node, "nonce sequence invalidated");
        }
    }

    /// Drop every cached sequence.
    pub fn invalidate_all(&self) {
        let dropped = self.slots.len();
        self.slots.clear();
        debug!(dropped, "nonce cache cleared");
    }

    /// Inspect a node's slot without waiting on it.
    pub fn peek(&self, node: &NodeId) -> SlotState {
        let Some(slot) = self.slots.get(node) else {
            return SlotState::Uninitialised;
        };
        let Ok(seq) = slot.try_lock() else {
            return SlotState::Busy;
        };
        match *seq {
            Sequence::Fresh => SlotState::Uninitialised,
            Sequence::Next(n) => SlotState::Next(n),
            Sequence::Exhausted => SlotState::Exhausted,
        }
    }

    /// Number of nodes with a slot.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
