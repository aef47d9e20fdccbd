//! Messaging domain: paired conversations, realtime delivery, seen receipts

pub mod api;
pub mod domain;
pub mod repository;
pub mod service;

// Re-export domain types at the crate root for convenience
pub use domain::entities::*;
pub use domain::errors::DeliveryError;
pub use domain::protocol::{ClientFrame, CloseReason, MessageEvent, ServerEvent};
pub use domain::state::{SessionEvent, SessionState, SessionStateMachine, StateError};

// Re-export repository types
pub use repository::{
    ConversationLog, ConversationStore, InMemoryConversationStore, InMemoryPairDirectory,
    PairDirectory, PgConversationStore, PgPairDirectory,
};

// Re-export service types
pub use service::{
    ConnectOptions, Connection, ConnectionHandle, ConnectionRegistry, DeliveryRouter, Outbound,
    PairLocks, SeenReconciler, Session, SessionGateway,
};

// Re-export API types
pub use api::routes;
pub use api::{MessagingSettings, MessagingState};
