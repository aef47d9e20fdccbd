//! Message delivery
//!
//! A send is validated and authorized before anything is written. The pair
//! lock is held across append and peer push so the peer observes messages in
//! sequence order. The store is authoritative: a failed push is logged and
//! the peer recovers through backfill.

use std::sync::Arc;

use uuid::Uuid;

use super::locks::PairLocks;
use super::registry::ConnectionRegistry;
use super::resolve_pair;
use crate::domain::entities::{ContentKind, Message, NewMessage, Pair, PairCode};
use crate::domain::errors::DeliveryError;
use crate::domain::protocol::{MessageEvent, ServerEvent};
use crate::repository::{ConversationStore, PairDirectory};

#[derive(Clone)]
pub struct DeliveryRouter {
    pairs: Arc<dyn PairDirectory>,
    store: Arc<dyn ConversationStore>,
    registry: ConnectionRegistry,
    locks: PairLocks,
}

impl DeliveryRouter {
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

    /// Persist a message and push it to the peer if connected
    pub async fn send(
        &self,
        pair_id: &PairCode,
        sender_id: Uuid,
        kind: ContentKind,
        payload: String,
    ) -> Result<Message, DeliveryError> {
        NewMessage::validate_payload(kind, &payload)?;

        let pair = resolve_pair(self.pairs.as_ref(), pair_id).await?;
        let sender = pair.require_member(sender_id)?;
        let draft = NewMessage::new(pair.id.clone(), sender, kind, payload)?;

        let _guard = self.locks.acquire(&pair.id).await;

        let message = self.store.append(draft).await?;

        tracing::info!(
            pair_id = %pair.id,
            sender_id = %sender_id,
            sequence = message.sequence,
            kind = %message.kind,
            "Message stored"
        );

        self.push_to_peer(&pair, &message);

        Ok(message)
    }

    fn push_to_peer(&self, pair: &Pair, message: &Message) {
        let Some(peer) = self.registry.lookup_peer(pair, message.sender_id) else {
            tracing::debug!(
                pair_id = %pair.id,
                sequence = message.sequence,
                "Peer offline; message left for backfill"
            );
            return;
        };

        if let Err(e) = peer
            .handle
            .push(ServerEvent::Message(MessageEvent::live(message)))
        {
            tracing::debug!(
                pair_id = %pair.id,
                participant_id = %peer.participant_id,
                sequence = message.sequence,
                error = %e,
                "Peer push failed; message left for backfill"
            );
        }
    }
}
