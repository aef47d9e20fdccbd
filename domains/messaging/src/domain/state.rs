//! Connection session state machine
//!
//! ```text
//! Disconnected --connect--> Connecting --auth_ok--> Authenticated --registered--> Active
//!                              |                          |                         |
//!                         auth_failed              transport_closed         transport_closed
//!                              v                          v                         v
//!                         Disconnected               Disconnected              Disconnected
//! ```
//!
//! Dispatch is only legal while Active and does not change state.

use serde::{Deserialize, Serialize};

pub use duet_common::StateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticated,
    Active,
}

impl SessionState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Events that drive session transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Transport opened
    Connect,
    /// Token verified
    AuthOk,
    /// Token rejected
    AuthFailed,
    /// Connection recorded in the registry
    Registered,
    /// Inbound frame handled
    Dispatch,
    /// Transport closed by either side, or registration refused
    TransportClosed,
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::AuthOk => write!(f, "auth_ok"),
            Self::AuthFailed => write!(f, "auth_failed"),
            Self::Registered => write!(f, "registered"),
            Self::Dispatch => write!(f, "dispatch"),
            Self::TransportClosed => write!(f, "transport_closed"),
        }
    }
}

pub struct SessionStateMachine;

impl SessionStateMachine {
    pub fn transition(
        current: SessionState,
        event: SessionEvent,
    ) -> Result<SessionState, StateError> {
        use SessionEvent as E;
        use SessionState as S;

        let next = match (current, event) {
            (S::Disconnected, E::Connect) => S::Connecting,
            (S::Connecting, E::AuthOk) => S::Authenticated,
            (S::Connecting, E::AuthFailed) => S::Disconnected,
            (S::Authenticated, E::Registered) => S::Active,
            (S::Active, E::Dispatch) => S::Active,
            (S::Connecting | S::Authenticated | S::Active, E::TransportClosed) => S::Disconnected,
            _ => {
                return Err(StateError::InvalidTransition {
                    from: current.to_string(),
                    to: "unknown".to_string(),
                    event: event.to_string(),
                })
            }
        };

        Ok(next)
    }

    pub fn can_transition(current: SessionState, event: SessionEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
