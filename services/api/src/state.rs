//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the HTTP client and the injected capabilities.

use crate::call::control::CallControl;
use crate::config::Config;
use std::sync::Arc;
use switchboard_core::lookup::AccountLookup;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub call_control: Arc<dyn CallControl>,
    pub lookup: Arc<dyn AccountLookup>,
}
