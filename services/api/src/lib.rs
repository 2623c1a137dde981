//! Switchboard API Library Crate
//!
//! This library contains all the core logic for the switchboard voice
//! gateway: configuration, application state, HTTP handlers, routing, and
//! the per-call bridging machinery under `call`. The `bin/api.rs` binary is
//! a thin wrapper around this library.

pub mod call;
pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
