//! In-memory storage implementations
//!
//! Used by tests and by the local server when no `DATABASE_URL` is set.
//! Each pair's log lives in its own map entry, so appends for one pair are
//! serialized by the entry lock while other pairs proceed independently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use duet_common::{Error, Result};
use uuid::Uuid;

use super::{ConversationStore, PairDirectory};
use crate::domain::entities::{Message, NewMessage, Pair, PairCode};

/// Pair directory seeded by the caller
#[derive(Clone, Default)]
pub struct InMemoryPairDirectory {
    pairs: Arc<DashMap<PairCode, Pair>>,
}

impl InMemoryPairDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a pair
    pub fn insert(&self, pair: Pair) {
        self.pairs.insert(pair.id.clone(), pair);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[mutants::skip] // Delegates to DashMap::is_empty
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[async_trait]
impl PairDirectory for InMemoryPairDirectory {
    async fn find(&self, pair_id: &PairCode) -> Result<Option<Pair>> {
        Ok(self.pairs.get(pair_id).map(|p| p.value().clone()))
    }
}

/// Conversation store holding every pair's log in memory
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    logs: Arc<DashMap<PairCode, Vec<Message>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage; every operation fails while set
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of messages stored for a pair
    pub fn message_count(&self, pair_id: &PairCode) -> usize {
        self.logs.get(pair_id).map(|log| log.len()).unwrap_or(0)
    }

    /// Snapshot of a pair's full log
    pub fn messages(&self, pair_id: &PairCode) -> Vec<Message> {
        self.logs
            .get(pair_id)
            .map(|log| log.value().clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("Conversation store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, message: NewMessage) -> Result<Message> {
        self.check_available()?;

        let mut log = self.logs.entry(message.pair_id.clone()).or_default();
        let sequence = log.last().map(|m| m.sequence + 1).unwrap_or(1);
        let stored = Message::from_new(message, sequence);
        log.push(stored.clone());

        Ok(stored)
    }

    async fn mark_seen(
        &self,
        pair_id: &PairCode,
        up_to: i64,
        seen_by: Uuid,
    ) -> Result<Vec<Message>> {
        self.check_available()?;

        let Some(mut log) = self.logs.get_mut(pair_id) else {
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let changed = log
            .iter_mut()
            .filter(|m| m.sequence <= up_to && m.sender_id != seen_by)
            .filter_map(|m| m.mark_seen(now).then(|| m.clone()))
            .collect();

        Ok(changed)
    }

    async fn list_page(&self, pair_id: &PairCode, after: i64, limit: i64) -> Result<Vec<Message>> {
        self.check_available()?;

        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(self
            .logs
            .get(pair_id)
            .map(|log| {
                log.iter()
                    .filter(|m| m.sequence > after)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest_peer_sequence(
        &self,
        pair_id: &PairCode,
        requester: Uuid,
    ) -> Result<Option<i64>> {
        self.check_available()?;

        Ok(self.logs.get(pair_id).and_then(|log| {
            log.iter()
                .filter(|m| m.sender_id != requester)
                .map(|m| m.sequence)
                .max()
        }))
    }
}
