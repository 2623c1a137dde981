//! Speech-agent conversational wire protocol.
//!
//! Every inbound message is JSON tagged by a `type` field; the enum below is
//! the closed set of kinds the service understands. Outbound frames are the
//! same except for the audio chunk, which the provider accepts as a bare
//! single-field object with no tag.

use serde::{Deserialize, Serialize};
use switchboard_core::tools::ToolParams;

/// A frame that failed structural validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid agent frame: {0}")]
pub struct AgentFrameError(#[from] serde_json::Error);

/// Frames received from the speech agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentFrame {
    ConversationInitiationMetadata {
        #[serde(rename = "conversation_initiation_metadata_event")]
        metadata: InitiationMetadata,
    },
    UserTranscript {
        #[serde(rename = "user_transcription_event")]
        event: UserTranscription,
    },
    AgentResponse {
        #[serde(rename = "agent_response_event")]
        event: AgentResponseEvent,
    },
    AgentResponseCorrection {
        #[serde(rename = "agent_response_correction_event")]
        event: AgentResponseCorrectionEvent,
    },
    Audio {
        #[serde(rename = "audio_event")]
        event: AudioEvent,
    },
    Interruption {
        #[serde(rename = "interruption_event")]
        event: InterruptionEvent,
    },
    Ping {
        #[serde(rename = "ping_event")]
        event: PingEvent,
    },
    ClientToolCall {
        #[serde(rename = "client_tool_call")]
        call: ClientToolCall,
    },
    /// Placeholder for future use; decoded and ignored.
    ContextualUpdate {
        #[serde(default)]
        text: Option<String>,
    },
    VadScore {
        #[serde(rename = "vad_score_event")]
        event: VadScoreEvent,
    },
    InternalTentativeAgentResponse {
        #[serde(rename = "tentative_agent_response_internal_event", default)]
        event: Option<TentativeAgentResponse>,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InitiationMetadata {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub agent_output_audio_format: Option<String>,
    #[serde(default)]
    pub user_input_audio_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserTranscription {
    pub user_transcript: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentResponseEvent {
    pub agent_response: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentResponseCorrectionEvent {
    #[serde(default)]
    pub original_agent_response: Option<String>,
    pub corrected_agent_response: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioEvent {
    pub audio_base_64: String,
    #[serde(default)]
    pub event_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterruptionEvent {
    #[serde(default)]
    pub event_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PingEvent {
    pub event_id: u64,
    #[serde(default)]
    pub ping_ms: Option<u64>,
}

/// The agent does not guarantee either field, so both are optional here and
/// validated where the call is routed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientToolCall {
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub parameters: Option<ToolParams>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VadScoreEvent {
    pub vad_score: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TentativeAgentResponse {
    #[serde(default)]
    pub tentative_agent_response: Option<String>,
}

impl AgentFrame {
    pub fn decode(raw: &str) -> Result<Self, AgentFrameError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Frames sent to the speech agent.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundAgentFrame {
    /// Opens the conversation; must be the first frame after connecting.
    Handshake,
    /// One opaque caller audio payload.
    AudioChunk { payload: String },
    /// Liveness reply echoing the ping's event id.
    Pong { event_id: u64 },
    /// The correlated result of a tool invocation.
    ToolResult {
        tool_call_id: String,
        result: String,
        is_error: bool,
    },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedOutbound<'a> {
    ConversationInitiationClientData,
    Pong {
        event_id: u64,
    },
    ClientToolResult {
        tool_call_id: &'a str,
        result: &'a str,
        is_error: bool,
    },
}

#[derive(Serialize)]
struct AudioChunkWire<'a> {
    user_audio_chunk: &'a str,
}

impl OutboundAgentFrame {
    pub fn encode(&self) -> Result<String, AgentFrameError> {
        let encoded = match self {
            Self::Handshake => {
                serde_json::to_string(&TaggedOutbound::ConversationInitiationClientData)?
            }
            Self::AudioChunk { payload } => serde_json::to_string(&AudioChunkWire {
                user_audio_chunk: payload,
            })?,
            Self::Pong { event_id } => serde_json::to_string(&TaggedOutbound::Pong {
                event_id: *event_id,
            })?,
            Self::ToolResult {
                tool_call_id,
                result,
                is_error,
            } => serde_json::to_string(&TaggedOutbound::ClientToolResult {
                tool_call_id,
                result,
                is_error: *is_error,
            })?,
        };
        Ok(encoded)
    }
}
