//! Caller-side redo loop and batch driver.
//!
//! [`Agent::call_api`] never retries on its own. Callers that want
//! resilience compose it with [`call_with_redo`]: on a transport failure the
//! agent's nonce cache is disabled (the node may have rejected a stale
//! nonce), the backoff delay elapses, and the call is made again, up to
//! `1 + max_redos` attempts. Signing and input errors are never redone.
//!
//! [`call_node_with_redo`] scopes the invalidation to one node, which is what
//! [`batch_call`] uses so a failing node cannot reset the sequences of the
//! healthy nodes it runs alongside.

use crate::agent::Agent;
use edgecall_types::{ApiRequest, CallResult, EdgeError, EdgeResult, NodeId, RedoPolicy};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a redo loop.
#[derive(Debug)]
pub enum RedoOutcome<T> {
    /// An attempt succeeded.
    Success {
        result: T,
        /// Total number of attempts made (1 = first call succeeded).
        attempts: u32,
    },
    /// Gave up. `last_error` is the failure of the final attempt.
    Exhausted { last_error: EdgeError, attempts: u32 },
}

impl<T> RedoOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RedoOutcome::Success { attempts, .. } | RedoOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Collapse into a plain result, surfacing the last error on exhaustion.
    pub fn into_result(self) -> EdgeResult<T> {
        match self {
            RedoOutcome::Success { result, .. } => Ok(result),
            RedoOutcome::Exhausted { last_error, .. } => Err(last_error),
        }
    }
}

/// Delay before redo number `redo` (0-indexed), in milliseconds.
///
/// `min(min_delay * 2^redo, max_delay) * (1 + random * jitter)`, capped at
/// `max_delay`.
pub fn compute_backoff(policy: &RedoPolicy, redo: u32) -> u64 {
    let base = policy
        .min_delay_ms
        .saturating_mul(1u64.checked_shl(redo).unwrap_or(u64::MAX));
    let capped = base.min(policy.max_delay_ms);
    if capped == 0 || policy.jitter <= 0.0 {
        return capped;
    }

    let frac: f64 = rand::thread_rng().gen();
    let with_jitter = capped as f64 * (1.0 + frac * policy.jitter.min(1.0));
    (with_jitter as u64).min(policy.max_delay_ms)
}

/// Run `operation` under `policy`, disabling `agent`'s nonce cache after each
/// transport failure.
pub async fn call_with_redo<F, Fut, T>(
    agent: &Agent,
    policy: &RedoPolicy,
    operation: F,
) -> RedoOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EdgeResult<T>>,
{
    redo_loop(policy, || agent.disable_nonce_cache(), operation).await
}

/// Like [`call_with_redo`], but a transport failure only invalidates the
/// sequence of `node`. Sequences of other nodes, possibly in use by
/// concurrent calls, are left alone.
pub async fn call_node_with_redo<F, Fut, T>(
    agent: &Agent,
    node: &NodeId,
    policy: &RedoPolicy,
    operation: F,
) -> RedoOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EdgeResult<T>>,
{
    redo_loop(policy, || agent.invalidate_node(node), operation).await
}

async fn redo_loop<F, Fut, T, I>(
    policy: &RedoPolicy,
    invalidate: I,
    mut operation: F,
) -> RedoOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EdgeResult<T>>,
    I: Fn(),
{
    let total = policy.total_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "call succeeded after redo");
                }
                return RedoOutcome::Success {
                    result,
                    attempts: attempt,
                };
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            debug!(attempt, error = %err, "error is not redoable, giving up");
            return RedoOutcome::Exhausted {
                last_error: err,
                attempts: attempt,
            };
        }

        invalidate();

        if attempt >= total {
            warn!(attempt, max_redos = policy.max_redos, error = %err, "redo attempts exhausted");
            return RedoOutcome::Exhausted {
                last_error: err,
                attempts: attempt,
            };
        }

        let delay_ms = compute_backoff(policy, attempt - 1);
        debug!(attempt, delay_ms, error = %err, "redoing call");
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

/// Issue every request concurrently, each under its own redo loop.
///
/// A failing request only invalidates its own node's nonce sequence.
/// Results come back in the order of `requests`.
pub async fn batch_call(
    agent: &Agent,
    requests: &[ApiRequest],
    policy: &RedoPolicy,
) -> Vec<EdgeResult<CallResult>> {
    let calls = requests.iter().map(|req| async move {
        call_node_with_redo(agent, &req.node, policy, move || {
            agent.call_api(&req.node, &req.path, &req.body, req.method)
        })
        .await
        .into_result()
    });
    futures::future::join_all(calls).await
}
