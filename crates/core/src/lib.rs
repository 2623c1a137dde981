//! Core domain logic for the switchboard voice mailbox gateway.
//!
//! This crate holds everything a call session needs that is not tied to a
//! transport: the mail-driver capability, the phone-to-account lookup, the
//! conversation history, and the tool dispatcher the speech agent drives.
//! The network-facing service in `services/api` wires these together per call.

pub mod driver;
pub mod history;
pub mod lookup;
pub mod tools;
