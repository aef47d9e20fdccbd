//! Repository implementations for the Messaging domain
//!
//! Storage is reached through two traits so the realtime core can run on
//! Postgres in production and on the in-memory stores in tests and local
//! development.

pub mod log;
pub mod memory;
pub mod messages;
pub mod pairs;

use async_trait::async_trait;
use duet_common::Result;
use uuid::Uuid;

use crate::domain::entities::{Message, NewMessage, Pair, PairCode};

pub use log::ConversationLog;
pub use memory::{InMemoryConversationStore, InMemoryPairDirectory};
pub use messages::PgConversationStore;
pub use pairs::PgPairDirectory;

/// Read-only lookup of established pairs
#[async_trait]
pub trait PairDirectory: Send + Sync {
    async fn find(&self, pair_id: &PairCode) -> Result<Option<Pair>>;
}

/// Durable, per-pair ordered message log
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a message with the next sequence number for its pair.
    /// Appends for the same pair never share a sequence number.
    async fn append(&self, message: NewMessage) -> Result<Message>;

    /// Mark every unseen message with `sequence <= up_to` that was not sent
    /// by `seen_by` as seen. Returns only the messages that changed, in
    /// sequence order.
    async fn mark_seen(&self, pair_id: &PairCode, up_to: i64, seen_by: Uuid)
        -> Result<Vec<Message>>;

    /// Messages with `sequence > after`, ascending, at most `limit`
    async fn list_page(&self, pair_id: &PairCode, after: i64, limit: i64) -> Result<Vec<Message>>;

    /// Highest sequence authored by anyone other than `requester`
    async fn latest_peer_sequence(&self, pair_id: &PairCode, requester: Uuid)
        -> Result<Option<i64>>;
}
