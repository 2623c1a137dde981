//! Live Call Bridging
//!
//! This module contains the machinery for one bridged phone call. It is
//! structured into submodules for clarity:
//!
//! - `protocol`: the telephony media-stream frame codec.
//! - `agent`: the speech-agent link (its frame codec and connection task).
//! - `session`: the per-call orchestrator that owns both links.
//! - `lifecycle`: the session expiry deadline.
//! - `control`: the telephony provider's call-control capability.

pub mod agent;
pub mod control;
pub mod lifecycle;
pub mod protocol;
pub mod session;

pub use session::call_handler;
