//! Session gateway
//!
//! Drives one connection through its lifecycle: authenticate the token,
//! register with the registry and replay history, then dispatch inbound
//! frames until the transport closes. Registration and replay share one
//! hold of the pair lock, so a peer send either lands in the replay or is
//! pushed live after it.

use std::sync::Arc;

use futures::StreamExt;
use uuid::Uuid;

use duet_auth::{AuthBackend, AuthContext};

use super::connection::{Connection, ConnectionHandle};
use super::locks::PairLocks;
use super::registry::ConnectionRegistry;
use super::router::DeliveryRouter;
use super::seen::SeenReconciler;
use crate::domain::entities::{Message, PairCode};
use crate::domain::errors::DeliveryError;
use crate::domain::protocol::{ClientFrame, CloseReason, MessageEvent, ServerEvent};
use crate::domain::state::{SessionEvent, SessionState, SessionStateMachine, StateError};
use crate::repository::{ConversationLog, ConversationStore};

/// Options supplied by the client when opening a socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Replay history after this sequence (0 when absent)
    pub since: Option<i64>,
    /// Client window is visible; mark the peer's messages seen on open
    pub foreground: bool,
}

#[derive(Clone)]
pub struct SessionGateway {
    auth: AuthBackend,
    store: Arc<dyn ConversationStore>,
    registry: ConnectionRegistry,
    router: DeliveryRouter,
    seen: SeenReconciler,
    locks: PairLocks,
    replay_page_size: i64,
}

impl SessionGateway {
    pub fn new(
        auth: AuthBackend,
        store: Arc<dyn ConversationStore>,
        registry: ConnectionRegistry,
        router: DeliveryRouter,
        seen: SeenReconciler,
        locks: PairLocks,
    ) -> Self {
        Self {
            auth,
            store,
            registry,
            router,
            seen,
            locks,
            replay_page_size: crate::repository::log::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_replay_page_size(mut self, page_size: i64) -> Self {
        self.replay_page_size = page_size.max(1);
        self
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Open a session on `handle`. On failure the handle is closed with the
    /// matching close reason and the error is returned.
    pub async fn connect(
        &self,
        pair_code: &str,
        token: &str,
        handle: ConnectionHandle,
        options: ConnectOptions,
    ) -> Result<Session, DeliveryError> {
        let mut state = advance(SessionState::Disconnected, SessionEvent::Connect)?;

        let participant = match self.auth.authenticate_token(token) {
            Ok(ctx) => ctx,
            Err(e) => {
                advance(state, SessionEvent::AuthFailed)?;
                let err = DeliveryError::from(e);
                tracing::warn!(pair_id = %pair_code, error = %err, "Socket authentication failed");
                handle.close(err.close_reason());
                return Err(err);
            }
        };
        state = advance(state, SessionEvent::AuthOk)?;

        let registered = match PairCode::parse(pair_code) {
            Ok(pair_id) => {
                self.register_and_replay(
                    participant.participant_id,
                    &pair_id,
                    handle.clone(),
                    options.since,
                )
                .await
            }
            Err(e) => Err(e),
        };

        let connection = match registered {
            Ok(connection) => connection,
            Err(err) => {
                advance(state, SessionEvent::TransportClosed)?;
                tracing::warn!(
                    pair_id = %pair_code,
                    participant_id = %participant.participant_id,
                    error = %err,
                    "Socket registration refused"
                );
                handle.close(err.close_reason());
                return Err(err);
            }
        };
        state = advance(state, SessionEvent::Registered)?;

        tracing::info!(
            pair_id = %connection.pair_id,
            participant_id = %participant.participant_id,
            display_name = participant.display_name(),
            "Session active"
        );

        let session = Session {
            participant,
            connection,
            state,
            router: self.router.clone(),
            seen: self.seen.clone(),
            registry: self.registry.clone(),
        };

        if options.foreground {
            if let Err(e) = self
                .seen
                .handle_mark_seen(&session.connection.pair_id, session.participant_id())
                .await
            {
                tracing::warn!(
                    pair_id = %session.connection.pair_id,
                    error = %e,
                    "Mark seen on open failed"
                );
            }
        }

        Ok(session)
    }

    async fn register_and_replay(
        &self,
        participant_id: Uuid,
        pair_id: &PairCode,
        handle: ConnectionHandle,
        since: Option<i64>,
    ) -> Result<Connection, DeliveryError> {
        let pair = self.registry.member_pair(participant_id, pair_id).await?;

        let _guard = self.locks.acquire(&pair.id).await;
        let connection = self
            .registry
            .register(participant_id, &pair.id, handle)
            .await?;
        self.replay(&connection, since).await;

        Ok(connection)
    }

    /// Push the durable log after `since` as historical events.
    /// Caller holds the pair lock.
    async fn replay(&self, connection: &Connection, since: Option<i64>) {
        let log = ConversationLog::new(Arc::clone(&self.store), connection.pair_id.clone(), since)
            .with_page_size(self.replay_page_size);

        let mut stream = log.stream();
        let mut replayed = 0usize;
        while let Some(item) = stream.next().await {
            match item {
                Ok(message) => {
                    let event = ServerEvent::Message(MessageEvent::historical(&message));
                    if connection.handle.push(event).is_err() {
                        return;
                    }
                    replayed += 1;
                }
                Err(e) => {
                    let err = DeliveryError::from(e);
                    tracing::warn!(
                        pair_id = %connection.pair_id,
                        error = %err,
                        "History replay failed"
                    );
                    let _ = connection.handle.push(ServerEvent::error(&err));
                    return;
                }
            }
        }

        tracing::debug!(
            pair_id = %connection.pair_id,
            participant_id = %connection.participant_id,
            replayed,
            "History replayed"
        );
    }
}

fn advance(current: SessionState, event: SessionEvent) -> Result<SessionState, DeliveryError> {
    SessionStateMachine::transition(current, event).map_err(|e: StateError| {
        tracing::error!(error = %e, "Session state violation");
        DeliveryError::ConnectionClosed
    })
}

/// An active participant session bound to one connection
pub struct Session {
    participant: AuthContext,
    connection: Connection,
    state: SessionState,
    router: DeliveryRouter,
    seen: SeenReconciler,
    registry: ConnectionRegistry,
}

impl Session {
    pub fn participant_id(&self) -> Uuid {
        self.participant.participant_id
    }

    pub fn participant(&self) -> &AuthContext {
        &self.participant
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active() && !self.connection.handle.is_closed()
    }

    /// Parse and dispatch a raw text frame
    pub async fn handle_text(&mut self, raw: &str) -> Result<(), DeliveryError> {
        match ClientFrame::parse(raw) {
            Ok(frame) => self.dispatch(frame).await,
            Err(err) => {
                if !self.is_active() {
                    return self.fail_closed();
                }
                let _ = self.connection.handle.push(ServerEvent::error(&err));
                Err(err)
            }
        }
    }

    /// Handle one inbound frame. Errors are also reported to the client as
    /// an `error` event.
    pub async fn dispatch(&mut self, frame: ClientFrame) -> Result<(), DeliveryError> {
        if !self.is_active() {
            return self.fail_closed();
        }
        self.state = advance(self.state, SessionEvent::Dispatch)?;

        let result = match frame {
            ClientFrame::Send { kind, content } => self
                .router
                .send(
                    &self.connection.pair_id,
                    self.participant.participant_id,
                    kind,
                    content,
                )
                .await
                .map(|message| self.echo(&message)),
            ClientFrame::MarkSeen => self
                .seen
                .handle_mark_seen(&self.connection.pair_id, self.participant.participant_id)
                .await
                .map(|_| ()),
        };

        if let Err(err) = &result {
            tracing::debug!(
                pair_id = %self.connection.pair_id,
                participant_id = %self.participant.participant_id,
                error = %err,
                "Frame rejected"
            );
            let _ = self.connection.handle.push(ServerEvent::error(err));
        }

        result
    }

    /// Show the stored message on the sender's own connection
    fn echo(&self, message: &Message) {
        if let Err(e) = self
            .connection
            .handle
            .push(ServerEvent::Message(MessageEvent::live(message)))
        {
            tracing::debug!(
                participant_id = %self.participant.participant_id,
                error = %e,
                "Echo to sender failed"
            );
        }
    }

    /// The transport went away; release the registry entry
    pub fn transport_closed(&mut self) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.connection.handle.mark_closed();
        self.registry.release(&self.connection);
        self.state = SessionState::Disconnected;

        tracing::info!(
            pair_id = %self.connection.pair_id,
            participant_id = %self.participant.participant_id,
            "Session closed"
        );
    }

    /// Close from the server side with a reason sent to the client
    pub fn close(&mut self, reason: CloseReason) {
        self.connection.handle.close(reason);
        self.transport_closed();
    }

    fn fail_closed(&mut self) -> Result<(), DeliveryError> {
        self.transport_closed();
        Err(DeliveryError::ConnectionClosed)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.transport_closed();
    }
}
