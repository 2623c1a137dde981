//! Axum Handlers for the HTTP surface
//!
//! The telephony provider calls `POST /voice` when a call comes in; the
//! response is call-control markup instructing it to open a bidirectional
//! media stream back to this service's WebSocket endpoint for that call.

use axum::{
    extract::{Form, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;

/// The form fields of interest on the provider's incoming-call webhook.
#[derive(Debug, Deserialize)]
pub struct VoiceWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From")]
    pub from: String,
}

/// Answers an incoming call with `<Connect><Stream>` markup pointing the
/// provider at this call's media stream endpoint.
pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    Form(webhook): Form<VoiceWebhook>,
) -> Response {
    info!(call_sid = %webhook.call_sid, from = %webhook.from, "Incoming voice call");
    let twiml = connect_stream_twiml(&state.config.public_host, &webhook.call_sid);
    ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response()
}

fn connect_stream_twiml(public_host: &str, call_sid: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Connect><Stream url=\"wss://{public_host}/call/{call_sid}\"/></Connect></Response>"
    )
}

pub async fn health() -> &'static str {
    "ok"
}
