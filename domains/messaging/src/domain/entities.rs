//! Domain entities for the Messaging domain
//!
//! Pairs and participants are established by the external pairing flow and
//! only read here. Messages are created by the delivery router and only
//! their seen state ever changes afterwards.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DeliveryError;

/// Maximum payload length in bytes (text body or media URI)
pub const MAX_PAYLOAD_LENGTH: usize = 16 * 1024;

/// Maximum pair code length
const MAX_PAIR_CODE_LENGTH: usize = 64;

lazy_static! {
    /// Pair codes are word characters only, as they appear in socket URLs
    static ref PAIR_CODE_REGEX: Regex = Regex::new(r"^\w+$").unwrap();
}

/// Pair identifier: the partner code shared by both participants
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PairCode(String);

impl PairCode {
    /// Parse and validate a pair code
    pub fn parse(code: impl Into<String>) -> Result<Self, DeliveryError> {
        let code = code.into();
        if code.is_empty() || code.len() > MAX_PAIR_CODE_LENGTH {
            return Err(DeliveryError::UnknownPair(code));
        }
        if !PAIR_CODE_REGEX.is_match(&code) {
            return Err(DeliveryError::UnknownPair(code));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PairCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user within a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
}

impl Participant {
    pub fn new(user_id: Uuid, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            email: email.into(),
        }
    }
}

/// Exclusive two-participant relationship scoping a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pair {
    pub id: PairCode,
    pub participant_a: Participant,
    pub participant_b: Participant,
    pub created_at: DateTime<Utc>,
}

impl Pair {
    /// Establish a pair. Both participants must be distinct users.
    pub fn new(
        id: PairCode,
        participant_a: Participant,
        participant_b: Participant,
    ) -> duet_common::Result<Self> {
        if participant_a.user_id == participant_b.user_id {
            return Err(duet_common::Error::Validation(
                "A pair requires two distinct participants".to_string(),
            ));
        }

        Ok(Pair {
            id,
            participant_a,
            participant_b,
            created_at: Utc::now(),
        })
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member(user_id).is_some()
    }

    /// The participant with this user id, if they belong to the pair
    pub fn member(&self, user_id: Uuid) -> Option<&Participant> {
        [&self.participant_a, &self.participant_b]
            .into_iter()
            .find(|p| p.user_id == user_id)
    }

    /// The other participant, if `user_id` belongs to the pair
    pub fn peer_of(&self, user_id: Uuid) -> Option<&Participant> {
        if self.participant_a.user_id == user_id {
            Some(&self.participant_b)
        } else if self.participant_b.user_id == user_id {
            Some(&self.participant_a)
        } else {
            None
        }
    }

    /// Resolve a member or fail with `Unauthorized`
    pub fn require_member(&self, user_id: Uuid) -> Result<&Participant, DeliveryError> {
        self.member(user_id)
            .ok_or_else(|| DeliveryError::Unauthorized {
                participant_id: user_id,
                pair_id: self.id.to_string(),
            })
    }
}

/// Content kind of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Audio,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentKind::Text => write!(f, "text"),
            ContentKind::Image => write!(f, "image"),
            ContentKind::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for ContentKind {
    type Err = DeliveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentKind::Text),
            "image" => Ok(ContentKind::Image),
            "audio" => Ok(ContentKind::Audio),
            other => Err(DeliveryError::InvalidPayload(format!(
                "Unsupported content kind '{}'",
                other
            ))),
        }
    }
}

/// A validated message that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub pair_id: PairCode,
    pub sender_id: Uuid,
    pub sender_email: String,
    pub kind: ContentKind,
    pub payload: String,
}

impl NewMessage {
    /// Build a message draft, rejecting malformed payloads before any persistence
    pub fn new(
        pair_id: PairCode,
        sender: &Participant,
        kind: ContentKind,
        payload: String,
    ) -> Result<Self, DeliveryError> {
        Self::validate_payload(kind, &payload)?;

        Ok(Self {
            pair_id,
            sender_id: sender.user_id,
            sender_email: sender.email.clone(),
            kind,
            payload,
        })
    }

    /// Payload rules: non-blank text or URI, at most `MAX_PAYLOAD_LENGTH` bytes
    pub fn validate_payload(kind: ContentKind, payload: &str) -> Result<(), DeliveryError> {
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(DeliveryError::InvalidPayload(format!(
                "Payload must be at most {} bytes",
                MAX_PAYLOAD_LENGTH
            )));
        }

        match kind {
            ContentKind::Text if payload.trim().is_empty() => Err(DeliveryError::InvalidPayload(
                "Text message cannot be empty or whitespace-only".to_string(),
            )),
            ContentKind::Image | ContentKind::Audio if payload.trim().is_empty() => {
                Err(DeliveryError::InvalidPayload(format!(
                    "{} message requires a URI reference",
                    kind
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub pair_id: PairCode,
    pub sequence: i64,
    pub sender_id: Uuid,
    pub sender_email: String,
    pub kind: ContentKind,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub seen: bool,
    pub seen_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Materialize a draft with its assigned sequence number
    pub fn from_new(new: NewMessage, sequence: i64) -> Self {
        Message {
            id: Uuid::new_v4(),
            pair_id: new.pair_id,
            sequence,
            sender_id: new.sender_id,
            sender_email: new.sender_email,
            kind: new.kind,
            payload: new.payload,
            created_at: Utc::now(),
            seen: false,
            seen_at: None,
        }
    }

    /// Flip `seen` to true. Returns false when already seen; never flips back.
    pub fn mark_seen(&mut self, at: DateTime<Utc>) -> bool {
        if self.seen {
            return false;
        }
        self.seen = true;
        self.seen_at = Some(at);
        true
    }
}
