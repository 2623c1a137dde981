//! Telephony media-stream wire protocol.
//!
//! The provider frames every message as JSON tagged by an `event` field.
//! Decoding is total: anything that is not one of the known kinds comes back
//! as a [`TelephonyFrameError`] for the caller to log and drop, never a panic.

use serde::{Deserialize, Serialize};

/// A frame that failed structural validation.
#[derive(Debug, thiserror::Error)]
#[error("invalid telephony frame: {0}")]
pub struct TelephonyFrameError(#[from] serde_json::Error);

/// Frames received from the telephony media stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyFrame {
    /// The provider opened the socket; informational only.
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
    /// Audio streaming begins; carries the stream identifier every later
    /// media frame is addressed by.
    Start {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        start: StreamStart,
    },
    /// One chunk of caller audio. The payload is an opaque encoded blob and
    /// is relayed without inspection.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: MediaChunk,
    },
    /// Audio streaming ended; the call is over.
    Stop {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        stop: StreamStop,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    pub account_sid: String,
    pub call_sid: String,
    #[serde(default)]
    pub tracks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaChunk {
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStop {
    pub account_sid: String,
    pub call_sid: String,
}

impl TelephonyFrame {
    pub fn decode(raw: &str) -> Result<Self, TelephonyFrameError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Frames sent to the telephony media stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundTelephonyFrame {
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

impl OutboundTelephonyFrame {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn encode(&self) -> Result<String, TelephonyFrameError> {
        Ok(serde_json::to_string(self)?)
    }
}
