//! Seen-state reconciliation
//!
//! Marks everything the peer has sent so far as seen for the requester and
//! notifies the original sender. Senders who are offline get no queued
//! updates; they read the seen flags through backfill.

use std::sync::Arc;

use uuid::Uuid;

use super::locks::PairLocks;
use super::registry::ConnectionRegistry;
use super::resolve_pair;
use crate::domain::entities::{Message, PairCode};
use crate::domain::errors::DeliveryError;
use crate::domain::protocol::ServerEvent;
use crate::repository::{ConversationStore, PairDirectory};

#[derive(Clone)]
pub struct SeenReconciler {
    pairs: Arc<dyn PairDirectory>,
    store: Arc<dyn ConversationStore>,
    registry: ConnectionRegistry,
    locks: PairLocks,
}

impl SeenReconciler {
    pub fn new(
        pairs: Arc<dyn PairDirectory>,
        store: Arc<dyn ConversationStore>,
        registry: ConnectionRegistry,
        locks: PairLocks,
    ) -> Self {
        Self {
            pairs,
            store,
            registry,
            locks,
        }
    }

    /// Mark the peer's messages seen on behalf of `requester_id`.
    /// Returns the messages whose state changed; empty when nothing was new.
    pub async fn handle_mark_seen(
        &self,
        pair_id: &PairCode,
        requester_id: Uuid,
    ) -> Result<Vec<Message>, DeliveryError> {
        let pair = resolve_pair(self.pairs.as_ref(), pair_id).await?;
        pair.require_member(requester_id)?;

        let _guard = self.locks.acquire(&pair.id).await;

        let Some(up_to) = self
            .store
            .latest_peer_sequence(&pair.id, requester_id)
            .await?
        else {
            return Ok(Vec::new());
        };

        let changed = self.store.mark_seen(&pair.id, up_to, requester_id).await?;
        if changed.is_empty() {
            return Ok(changed);
        }

        tracing::debug!(
            pair_id = %pair.id,
            participant_id = %requester_id,
            up_to,
            count = changed.len(),
            "Messages marked seen"
        );

        for message in &changed {
            let Some(connection) = self
                .registry
                .lookup(message.sender_id)
                .filter(|c| c.pair_id == pair.id)
            else {
                continue;
            };

            if let Err(e) = connection.handle.push(ServerEvent::seen_update(message)) {
                tracing::debug!(
                    pair_id = %pair.id,
                    sequence = message.sequence,
                    error = %e,
                    "Seen update push failed"
                );
            }
        }

        Ok(changed)
    }
}
