//! Connection registry
//!
//! Tracks at most one live connection per participant. Registering again
//! supersedes the previous connection, which is closed with
//! `ALREADY_ACTIVE_ELSEWHERE` before the new one becomes visible.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::connection::{Connection, ConnectionHandle};
use super::resolve_pair;
use crate::domain::entities::{Pair, PairCode};
use crate::domain::errors::DeliveryError;
use crate::domain::protocol::{CloseReason, ServerEvent};
use crate::repository::PairDirectory;

#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<Uuid, Connection>>,
    pairs: Arc<dyn PairDirectory>,
}

impl ConnectionRegistry {
    pub fn new(pairs: Arc<dyn PairDirectory>) -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
            pairs,
        }
    }

    /// The pair `participant_id` may register against
    pub async fn member_pair(
        &self,
        participant_id: Uuid,
        pair_id: &PairCode,
    ) -> Result<Pair, DeliveryError> {
        let pair = resolve_pair(self.pairs.as_ref(), pair_id).await?;
        pair.require_member(participant_id)?;
        Ok(pair)
    }

    /// Record a connection for a pair member, replacing any earlier one
    pub async fn register(
        &self,
        participant_id: Uuid,
        pair_id: &PairCode,
        handle: ConnectionHandle,
    ) -> Result<Connection, DeliveryError> {
        let pair = self.member_pair(participant_id, pair_id).await?;

        let connection = Connection::new(participant_id, pair.id.clone(), handle);

        if let Some(previous) = self.connections.insert(participant_id, connection.clone()) {
            if !previous.same_handle(&connection) {
                previous.handle.close(CloseReason::AlreadyActiveElsewhere);
                tracing::info!(
                    participant_id = %participant_id,
                    pair_id = %pair.id,
                    superseded = %previous.handle.id(),
                    "Connection superseded"
                );
            }
        }

        tracing::debug!(
            participant_id = %participant_id,
            pair_id = %pair.id,
            connection_id = %connection.handle.id(),
            "Connection registered"
        );

        Ok(connection)
    }

    pub fn lookup(&self, participant_id: Uuid) -> Option<Connection> {
        self.connections
            .get(&participant_id)
            .map(|entry| entry.value().clone())
    }

    /// The other member's live connection, if it is bound to this pair
    pub fn lookup_peer(&self, pair: &Pair, participant_id: Uuid) -> Option<Connection> {
        let peer = pair.peer_of(participant_id)?;
        self.lookup(peer.user_id)
            .filter(|connection| connection.pair_id == pair.id)
    }

    /// Remove whatever connection the participant has. Idempotent.
    pub fn unregister(&self, participant_id: Uuid) -> Option<Connection> {
        self.connections
            .remove(&participant_id)
            .map(|(_, connection)| connection)
    }

    /// Remove the entry only if it still belongs to `connection`
    pub fn release(&self, connection: &Connection) -> bool {
        let removed = self
            .connections
            .remove_if(&connection.participant_id, |_, current| {
                current.same_handle(connection)
            })
            .is_some();

        if removed {
            tracing::debug!(
                participant_id = %connection.participant_id,
                connection_id = %connection.handle.id(),
                "Connection released"
            );
        }
        removed
    }

    /// Push an event to every live connection of the pair.
    /// Returns how many pushes were accepted.
    pub fn broadcast(&self, pair: &Pair, event: &ServerEvent) -> usize {
        [pair.participant_a.user_id, pair.participant_b.user_id]
            .into_iter()
            .filter_map(|user_id| self.lookup(user_id))
            .filter(|connection| connection.pair_id == pair.id)
            .filter(|connection| match connection.handle.push(event.clone()) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(
                        participant_id = %connection.participant_id,
                        error = %e,
                        "Broadcast push failed"
                    );
                    false
                }
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[mutants::skip] // Delegates to DashMap::is_empty
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
