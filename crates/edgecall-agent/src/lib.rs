//! Edge agent: signed request dispatch to edge compute nodes.
//!
//! An [`Agent`] owns one signing identity and a per-node [`NonceCache`]. It
//! exposes two call shapes, [`Agent::probe`] and [`Agent::call_api`], and
//! leaves redo decisions to the caller ([`redo::call_with_redo`],
//! [`redo::batch_call`]).
//!
//! ```text
//! Agent ─▶ NonceCache ─▶ sign_request ─▶ Transport ─▶ CallResult
//!   ▲                                         │
//!   └──── disable_nonce_cache + redo ◀────────┘ (transport failure)
//! ```

pub mod agent;
pub mod config;
pub mod nonce;
pub mod redo;

pub use agent::Agent;
pub use config::load_config;
pub use nonce::{BaselineOrigin, ClockOrigin, NonceCache, NonceOrigin, SlotState};
pub use redo::{batch_call, call_node_with_redo, call_with_redo, RedoOutcome};
