//! Handles the real-time WebSocket connection to the ElevenLabs
//! conversational agent.
//!
//! The connection is established per call through a short-lived signed URL,
//! opened with a `conversation_initiation_client_data` handshake, and then
//! proxied: commands from the session go out, decoded frames come back as
//! [`AgentEvent`]s. Keepalive pings are answered inline in the read loop so a
//! pong can never queue behind outbound audio.

use super::{
    AgentCommand, AgentEvent,
    protocol::{AgentFrame, OutboundAgentFrame},
};
use crate::config::Config;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, error, info, warn};

const SIGNED_URL_ENDPOINT: &str =
    "https://api.elevenlabs.io/v1/convai/conversation/get_signed_url";

#[derive(Deserialize)]
struct SignedUrlResponse {
    signed_url: String,
}

/// Obtains the short-lived, call-scoped WebSocket URL for the configured agent.
async fn fetch_signed_url(http: &reqwest::Client, config: &Config) -> Result<String> {
    let response: SignedUrlResponse = http
        .get(SIGNED_URL_ENDPOINT)
        .query(&[("agent_id", config.elevenlabs_agent_id.as_str())])
        .header("xi-api-key", &config.elevenlabs_api_key)
        .send()
        .await
        .context("Signed URL request failed")?
        .error_for_status()
        .context("Signed URL request rejected")?
        .json()
        .await
        .context("Malformed signed URL response")?;
    Ok(response.signed_url)
}

/// What the read loop does with one decoded frame.
#[derive(Debug, PartialEq)]
enum FrameDisposition {
    /// Write this reply on the socket before touching any queued work.
    Reply(OutboundAgentFrame),
    /// Hand the frame to the session.
    Forward(AgentEvent),
    /// Observational frame; nothing to do beyond logging.
    Ignore,
}

fn dispatch_frame(frame: AgentFrame) -> FrameDisposition {
    match frame {
        AgentFrame::Ping { event } => FrameDisposition::Reply(OutboundAgentFrame::Pong {
            event_id: event.event_id,
        }),
        AgentFrame::ConversationInitiationMetadata { metadata } => {
            FrameDisposition::Forward(AgentEvent::Ready {
                conversation_id: metadata.conversation_id,
                agent_audio_format: metadata.agent_output_audio_format,
                user_audio_format: metadata.user_input_audio_format,
            })
        }
        AgentFrame::UserTranscript { event } => {
            FrameDisposition::Forward(AgentEvent::UserTranscript(event.user_transcript))
        }
        AgentFrame::AgentResponse { event } => {
            FrameDisposition::Forward(AgentEvent::AgentResponse(event.agent_response))
        }
        AgentFrame::AgentResponseCorrection { event } => FrameDisposition::Forward(
            AgentEvent::AgentResponseCorrection(event.corrected_agent_response),
        ),
        AgentFrame::Audio { event } => {
            FrameDisposition::Forward(AgentEvent::Audio(event.audio_base_64))
        }
        AgentFrame::ClientToolCall { call } => match (call.tool_name, call.tool_call_id) {
            (Some(tool_name), Some(tool_call_id)) => {
                FrameDisposition::Forward(AgentEvent::ToolCall {
                    tool_name,
                    tool_call_id,
                    parameters: call.parameters.unwrap_or_default(),
                })
            }
            _ => {
                warn!("Tool call frame without tool name or call id; dropping");
                FrameDisposition::Ignore
            }
        },
        AgentFrame::Interruption { event } => {
            debug!(event_id = ?event.event_id, "Agent interrupted");
            FrameDisposition::Ignore
        }
        AgentFrame::VadScore { event } => {
            debug!(vad_score = event.vad_score, "VAD score");
            FrameDisposition::Ignore
        }
        AgentFrame::InternalTentativeAgentResponse { .. } => FrameDisposition::Ignore,
        AgentFrame::ContextualUpdate { .. } => FrameDisposition::Ignore,
    }
}

/// Runs the main loop for the agent connection.
///
/// Returns once the socket closes from either side; the spawn wrapper in the
/// parent module turns that into an [`AgentEvent::Closed`] for the session.
pub async fn run(
    config: Arc<Config>,
    http: reqwest::Client,
    mut cmd_rx: mpsc::Receiver<AgentCommand>,
    event_tx: mpsc::Sender<AgentEvent>,
) -> Result<()> {
    let signed_url = fetch_signed_url(&http, &config).await?;
    let (ws_stream, _) = connect_async(signed_url)
        .await
        .context("Failed to connect to agent WebSocket")?;
    info!("Connected to speech agent.");
    let (mut agent_tx, mut agent_rx) = ws_stream.split();

    // Open the conversation before any audio flows.
    agent_tx
        .send(WsMessage::Text(
            OutboundAgentFrame::Handshake.encode()?.into(),
        ))
        .await
        .context("Failed to send conversation handshake")?;

    loop {
        tokio::select! {
            biased;
            cmd = cmd_rx.recv() => {
                let frame = match cmd {
                    Some(AgentCommand::SendAudio(payload)) => {
                        OutboundAgentFrame::AudioChunk { payload }
                    }
                    Some(AgentCommand::SendToolResult { tool_call_id, result, is_error }) => {
                        OutboundAgentFrame::ToolResult { tool_call_id, result, is_error }
                    }
                    Some(AgentCommand::Close) | None => {
                        let _ = agent_tx.send(WsMessage::Close(None)).await;
                        break;
                    }
                };
                if let Err(e) = agent_tx.send(WsMessage::Text(frame.encode()?.into())).await {
                    // Audio frames may legitimately race a closing socket.
                    warn!(error = %e, "Agent socket not open; dropping outbound frame");
                    break;
                }
            },
            msg = agent_rx.next() => match msg {
                Some(Ok(WsMessage::Text(text))) => match AgentFrame::decode(&text) {
                    Ok(frame) => match dispatch_frame(frame) {
                        FrameDisposition::Reply(reply) => {
                            agent_tx
                                .send(WsMessage::Text(reply.encode()?.into()))
                                .await
                                .context("Failed to send keepalive reply")?;
                        }
                        FrameDisposition::Forward(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        FrameDisposition::Ignore => {}
                    },
                    Err(e) => warn!(error = %e, "Dropping unrecognized agent frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(?frame, "Agent closed the socket");
                    break;
                }
                // Transport-level ping/pong is handled by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(error = %e, "Agent socket error");
                    break;
                }
                None => break,
            },
        }
    }
    Ok(())
}
