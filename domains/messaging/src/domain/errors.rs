//! Delivery error taxonomy
//!
//! Every failure in the realtime path maps to one of these kinds. Errors
//! raised inside a live session are reported to the originating connection
//! as an `error` event; errors raised while connecting close the transport.

use duet_auth::AuthError;
use uuid::Uuid;

use crate::domain::protocol::CloseReason;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Token missing or invalid
    #[error("Authentication failed: {0}")]
    Auth(AuthError),

    /// Pair identifier not found (or malformed)
    #[error("Pair not found: {0}")]
    UnknownPair(String),

    /// Participant is not a member of the pair
    #[error("Participant {participant_id} is not a member of pair {pair_id}")]
    Unauthorized { participant_id: Uuid, pair_id: String },

    /// Empty text, missing media reference, or oversized payload
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Operation attempted on a closed or inactive connection
    #[error("Connection is closed")]
    ConnectionClosed,

    /// Push to a live connection failed; the message stays persisted
    #[error("Push to connection failed")]
    TransientPushFailure,

    #[error(transparent)]
    Store(#[from] duet_common::Error),
}

impl DeliveryError {
    /// Machine-readable code sent in `error` events
    pub fn code(&self) -> &'static str {
        match self {
            DeliveryError::Auth(_) => "AUTH_FAILED",
            DeliveryError::UnknownPair(_) => "PAIR_NOT_FOUND",
            DeliveryError::Unauthorized { .. } => "UNAUTHORIZED",
            DeliveryError::InvalidPayload(_) => "INVALID_PAYLOAD",
            DeliveryError::ConnectionClosed => "CONNECTION_CLOSED",
            DeliveryError::TransientPushFailure => "PUSH_FAILED",
            DeliveryError::Store(_) => "STORE_ERROR",
        }
    }

    /// Close reason used when this error terminates a connection attempt
    pub fn close_reason(&self) -> CloseReason {
        match self {
            DeliveryError::Auth(_) => CloseReason::AuthFailed,
            DeliveryError::UnknownPair(_) => CloseReason::PairNotFound,
            DeliveryError::Unauthorized { .. } => CloseReason::Unauthorized,
            _ => CloseReason::InternalError,
        }
    }

    /// Message safe to send to clients; store internals are not exposed
    pub fn client_message(&self) -> String {
        match self {
            DeliveryError::Store(_) => "Message store unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<AuthError> for DeliveryError {
    fn from(err: AuthError) -> Self {
        DeliveryError::Auth(err)
    }
}

impl From<DeliveryError> for duet_common::Error {
    fn from(err: DeliveryError) -> Self {
        match err {
            DeliveryError::Auth(e) => duet_common::Error::Authentication(e.to_string()),
            DeliveryError::UnknownPair(code) => {
                duet_common::Error::NotFound(format!("Pair '{}' not found", code))
            }
            e @ DeliveryError::Unauthorized { .. } => {
                duet_common::Error::Authorization(e.to_string())
            }
            DeliveryError::InvalidPayload(msg) => duet_common::Error::Validation(msg),
            e @ DeliveryError::ConnectionClosed => duet_common::Error::Conflict(e.to_string()),
            e @ DeliveryError::TransientPushFailure => duet_common::Error::Internal(e.to_string()),
            DeliveryError::Store(e) => e,
        }
    }
}
