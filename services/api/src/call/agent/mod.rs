//! Speech-Agent Link
//!
//! Manages the outbound WebSocket connection to the conversational speech
//! service. The session talks to the link over two channels: commands in,
//! events out. The link never holds a reference to the session.

pub mod elevenlabs;
pub mod protocol;

use crate::config::Config;
use std::sync::Arc;
use switchboard_core::tools::ToolParams;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::error;

/// Commands the session sends to the agent link task.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCommand {
    /// Relay one opaque caller audio payload.
    SendAudio(String),
    /// Deliver a correlated tool result.
    SendToolResult {
        tool_call_id: String,
        result: String,
        is_error: bool,
    },
    /// Close the link.
    Close,
}

/// Events the agent link surfaces to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The conversation handshake completed; carries the negotiated formats.
    Ready {
        conversation_id: Option<String>,
        agent_audio_format: Option<String>,
        user_audio_format: Option<String>,
    },
    /// A finalized transcription of the caller's speech.
    UserTranscript(String),
    /// A committed agent utterance.
    AgentResponse(String),
    /// Replacement text for the most recent agent utterance.
    AgentResponseCorrection(String),
    /// One opaque agent audio payload to relay to the caller.
    Audio(String),
    /// The agent requested a tool invocation.
    ToolCall {
        tool_name: String,
        tool_call_id: String,
        parameters: ToolParams,
    },
    /// The socket closed or failed; the session must terminate.
    Closed,
}

/// Spawns the agent link task for one call.
///
/// Whatever way the link ends - clean close, connection failure, socket
/// error - the session always receives a final [`AgentEvent::Closed`].
pub fn start_agent_link(
    config: Arc<Config>,
    http: reqwest::Client,
) -> (
    mpsc::Sender<AgentCommand>,
    mpsc::Receiver<AgentEvent>,
    JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(128);
    let (event_tx, event_rx) = mpsc::channel(128);

    let handle = tokio::spawn(async move {
        if let Err(e) = elevenlabs::run(config, http, cmd_rx, event_tx.clone()).await {
            error!(error = ?e, "Speech-agent link failed");
        }
        let _ = event_tx.send(AgentEvent::Closed).await;
    });

    (cmd_tx, event_rx, handle)
}
