//! Transport handles for live connections
//!
//! A handle is the sending half of an unbounded channel drained by the
//! socket's writer task. Pushing never blocks the caller. Once a handle is
//! closed every later push fails, so a superseded socket never receives
//! another event.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::entities::PairCode;
use crate::domain::errors::DeliveryError;
use crate::domain::protocol::{CloseReason, ServerEvent};

/// Item queued for a socket writer
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Event(ServerEvent),
    Close(CloseReason),
}

#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
}

impl ConnectionHandle {
    /// Create a handle together with the receiver its writer drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        };
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }

    /// Queue an event for delivery
    pub fn push(&self, event: ServerEvent) -> Result<(), DeliveryError> {
        if self.is_closed() {
            return Err(DeliveryError::TransientPushFailure);
        }
        self.tx
            .send(Outbound::Event(event))
            .map_err(|_| DeliveryError::TransientPushFailure)
    }

    /// Close with a reason sent to the client. Returns false if already closed.
    pub fn close(&self, reason: CloseReason) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        // Writer may already be gone
        let _ = self.tx.send(Outbound::Close(reason));
        true
    }

    /// Mark closed without notifying the client (the transport is already gone)
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A participant's live session as recorded by the registry
#[derive(Debug, Clone)]
pub struct Connection {
    pub participant_id: Uuid,
    pub pair_id: PairCode,
    pub handle: ConnectionHandle,
    pub connected_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(participant_id: Uuid, pair_id: PairCode, handle: ConnectionHandle) -> Self {
        Self {
            participant_id,
            pair_id,
            handle,
            connected_at: Utc::now(),
        }
    }

    /// Whether both connections share the same transport handle
    pub fn same_handle(&self, other: &Connection) -> bool {
        self.handle.id() == other.handle.id()
    }
}
