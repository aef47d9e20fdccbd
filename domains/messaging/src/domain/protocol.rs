//! Realtime wire protocol
//!
//! Inbound frames are JSON objects with a `type` discriminator. Frames that
//! omit `type` are treated as text messages, which is what older clients send.
//! Outbound events use the same discriminator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::{ContentKind, Message};
use crate::domain::errors::DeliveryError;

/// A parsed inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Send { kind: ContentKind, content: String },
    MarkSeen,
}

#[derive(Debug, Deserialize)]
struct RawClientFrame {
    #[serde(rename = "type", default = "default_frame_type")]
    frame_type: String,
    #[serde(default)]
    content: Option<String>,
}

fn default_frame_type() -> String {
    "text".to_string()
}

impl ClientFrame {
    /// Parse a text frame received on the socket
    pub fn parse(raw: &str) -> Result<Self, DeliveryError> {
        let frame: RawClientFrame = serde_json::from_str(raw)
            .map_err(|e| DeliveryError::InvalidPayload(format!("Malformed frame: {}", e)))?;

        if frame.frame_type == "mark_seen" {
            return Ok(ClientFrame::MarkSeen);
        }

        let kind: ContentKind = frame.frame_type.parse()?;
        Ok(ClientFrame::Send {
            kind,
            content: frame.content.unwrap_or_default(),
        })
    }
}

/// Message as delivered to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    pub id: Uuid,
    pub pair_code: String,
    pub sequence: i64,
    pub sender_id: Uuid,
    pub sender_email: String,
    pub kind: ContentKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub seen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seen_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_historical: bool,
}

impl MessageEvent {
    pub fn live(message: &Message) -> Self {
        Self::build(message, false)
    }

    pub fn historical(message: &Message) -> Self {
        Self::build(message, true)
    }

    fn build(message: &Message, is_historical: bool) -> Self {
        MessageEvent {
            id: message.id,
            pair_code: message.pair_id.to_string(),
            sequence: message.sequence,
            sender_id: message.sender_id,
            sender_email: message.sender_email.clone(),
            kind: message.kind,
            content: message.payload.clone(),
            timestamp: message.created_at,
            seen: message.seen,
            seen_at: message.seen_at,
            is_historical,
        }
    }
}

/// Outbound event pushed to a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Message(MessageEvent),
    SeenUpdate {
        message_id: Uuid,
        sequence: i64,
        seen: bool,
        seen_at: Option<DateTime<Utc>>,
    },
    ReminderAlert {
        reminder: serde_json::Value,
    },
    Error {
        code: String,
        message: String,
    },
}

impl ServerEvent {
    pub fn seen_update(message: &Message) -> Self {
        ServerEvent::SeenUpdate {
            message_id: message.id,
            sequence: message.sequence,
            seen: message.seen,
            seen_at: message.seen_at,
        }
    }

    pub fn error(err: &DeliveryError) -> Self {
        ServerEvent::Error {
            code: err.code().to_string(),
            message: err.client_message(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Why the server closed a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    AuthFailed,
    Unauthorized,
    PairNotFound,
    IdleTimeout,
    AlreadyActiveElsewhere,
    InternalError,
}

impl CloseReason {
    /// WebSocket close code (application range 4000-4999)
    pub fn code(&self) -> u16 {
        match self {
            CloseReason::AuthFailed => 4001,
            CloseReason::Unauthorized => 4003,
            CloseReason::PairNotFound => 4004,
            CloseReason::IdleTimeout => 4008,
            CloseReason::AlreadyActiveElsewhere => 4009,
            CloseReason::InternalError => 1011,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            CloseReason::AuthFailed => "AUTH_FAILED",
            CloseReason::Unauthorized => "UNAUTHORIZED",
            CloseReason::PairNotFound => "PAIR_NOT_FOUND",
            CloseReason::IdleTimeout => "IDLE_TIMEOUT",
            CloseReason::AlreadyActiveElsewhere => "ALREADY_ACTIVE_ELSEWHERE",
            CloseReason::InternalError => "INTERNAL_ERROR",
        }
    }
}
