//! Agent configuration types.
//!
//! Loaded from `~/.edgecall/agent.toml` by the agent crate. Every field has a
//! default so a partial (or missing) file is always usable.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network identifier of the production edge network.
pub const MAINNET_ID: u64 = 1;
/// Network identifier of the public test network.
pub const TESTNET_ID: u64 = 2;

/// Top-level agent configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Network the agent signs for. Part of every signed envelope.
    pub network_id: u64,
    /// File holding the hex-encoded private key.
    pub key_file: Option<PathBuf>,
    /// Nonce cache settings.
    pub nonce: NonceConfig,
    /// Redo policy used by the batch driver.
    pub redo: RedoPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            network_id: MAINNET_ID,
            key_file: None,
            nonce: NonceConfig::default(),
            redo: RedoPolicy::default(),
        }
    }
}

/// Where a fresh nonce sequence starts for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonceOriginKind {
    /// Start every sequence at `NonceConfig::baseline`. A restarted sequence
    /// repeats values, so this only suits nodes without replay protection.
    Baseline,
    /// Start every sequence at the current Unix time in milliseconds.
    #[default]
    Clock,
}

/// Nonce cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NonceConfig {
    pub origin: NonceOriginKind,
    /// First nonce of a sequence when `origin = "baseline"`.
    pub baseline: u64,
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            origin: NonceOriginKind::Clock,
            baseline: 0,
        }
    }
}

/// Bounded redo policy applied by a caller around a dispatch call.
///
/// `max_redos` counts attempts *after* the first one: `max_redos = 1` means
/// at most two calls in total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedoPolicy {
    /// Redo attempts allowed after the initial call.
    pub max_redos: u32,
    /// Delay before the first redo in milliseconds (doubles per redo).
    pub min_delay_ms: u64,
    /// Upper bound on the delay between attempts in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter factor in `[0, 1]` applied on top of the delay.
    pub jitter: f64,
}

impl RedoPolicy {
    /// A policy with `max_redos` redos and no delay between attempts.
    pub fn immediate(max_redos: u32) -> Self {
        Self {
            max_redos,
            min_delay_ms: 0,
            max_delay_ms: 0,
            jitter: 0.0,
        }
    }

    /// Total number of calls this policy permits.
    pub fn total_attempts(&self) -> u32 {
        self.max_redos.saturating_add(1)
    }
}

impl Default for RedoPolicy {
    fn default() -> Self {
        Self {
            max_redos: 1,
            min_delay_ms: 0,
            max_delay_ms: 5_000,
            jitter: 0.0,
        }
    }
}
