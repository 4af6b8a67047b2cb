//! Realtime frame types.
//!
//! Frames arrive as `{"type": "...", "data": {...}}`. Known types decode
//! into dedicated variants; anything else is kept verbatim in
//! [`InboundEnvelope::Unknown`] so handlers can ignore it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Type tag of a newly created message
pub const NEW_MESSAGE: &str = "new_message";
/// Type tag of a message marked as read
pub const MESSAGE_READ: &str = "message_read";
/// Type tag of a deleted message
pub const MESSAGE_DELETED: &str = "message_deleted";

/// Payload carried by message frames. Every field may be absent or null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Message ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Message text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Message kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Read flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    /// Creation timestamp, ISO-8601 text as sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Update timestamp, ISO-8601 text as sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEnvelope {
    /// A message was created
    NewMessage(MessagePayload),
    /// A message was marked as read
    MessageRead(MessagePayload),
    /// A message was deleted
    MessageDeleted(MessagePayload),
    /// Unrecognized type, forwarded with its raw data
    Unknown {
        /// The `type` discriminator as received
        kind: String,
        /// The raw `data` value (`null` when absent)
        data: Value,
    },
}

/// Reasons a frame is dropped instead of dispatched
#[derive(Error, Debug)]
pub enum FrameDecodeError {
    /// Binary frame that is not UTF-8 text
    #[error("frame is not valid UTF-8")]
    NotUtf8,

    /// Text that is not a `{type, data}` object
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Serialize)]
struct RawFrameRef<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: Value,
}

impl InboundEnvelope {
    /// Decode one text frame
    pub fn from_json(text: &str) -> Result<Self, FrameDecodeError> {
        let raw: RawFrame = serde_json::from_str(text)?;

        let payload = |data: Value| -> Result<MessagePayload, FrameDecodeError> {
            if data.is_null() {
                Ok(MessagePayload::default())
            } else {
                Ok(serde_json::from_value(data)?)
            }
        };

        Ok(match raw.kind.as_str() {
            NEW_MESSAGE => Self::NewMessage(payload(raw.data)?),
            MESSAGE_READ => Self::MessageRead(payload(raw.data)?),
            MESSAGE_DELETED => Self::MessageDeleted(payload(raw.data)?),
            _ => Self::Unknown {
                kind: raw.kind,
                data: raw.data,
            },
        })
    }

    /// Decode a binary frame carrying UTF-8 JSON
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameDecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|_| FrameDecodeError::NotUtf8)?;
        Self::from_json(text)
    }

    /// The `type` discriminator
    pub fn kind(&self) -> &str {
        match self {
            Self::NewMessage(_) => NEW_MESSAGE,
            Self::MessageRead(_) => MESSAGE_READ,
            Self::MessageDeleted(_) => MESSAGE_DELETED,
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Message payload for known types
    pub fn payload(&self) -> Option<&MessagePayload> {
        match self {
            Self::NewMessage(p) | Self::MessageRead(p) | Self::MessageDeleted(p) => Some(p),
            Self::Unknown { .. } => None,
        }
    }

    /// Encode back into the wire format
    pub fn to_json(&self) -> serde_json::Result<String> {
        let data = match self {
            Self::NewMessage(p) | Self::MessageRead(p) | Self::MessageDeleted(p) => {
                serde_json::to_value(p)?
            }
            Self::Unknown { data, .. } => data.clone(),
        };
        serde_json::to_string(&RawFrameRef {
            kind: self.kind(),
            data,
        })
    }
}
