//! Conversation store backed by the `messages` table

use async_trait::async_trait;
use duet_common::{Error, Result};
use sqlx::PgPool;
use uuid::Uuid;

use super::ConversationStore;
use crate::domain::entities::{Message, NewMessage, PairCode};

#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn append(&self, message: NewMessage) -> Result<Message> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the pair serializes sequence allocation across processes
        let sequence: i64 = sqlx::query_scalar(
            r#"
            UPDATE pairs
            SET last_sequence = last_sequence + 1
            WHERE id = $1
            RETURNING last_sequence
            "#,
        )
        .bind(message.pair_id.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Pair '{}' not found", message.pair_id)))?;

        let stored = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, pair_id, sequence, sender_id, sender_email, kind, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, pair_id, sequence, sender_id, sender_email, kind, payload,
                      created_at, seen, seen_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.pair_id.as_str())
        .bind(sequence)
        .bind(message.sender_id)
        .bind(&message.sender_email)
        .bind(message.kind)
        .bind(&message.payload)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(stored)
    }

    async fn mark_seen(
        &self,
        pair_id: &PairCode,
        up_to: i64,
        seen_by: Uuid,
    ) -> Result<Vec<Message>> {
        let changed = sqlx::query_as::<_, Message>(
            r#"
            WITH updated AS (
                UPDATE messages
                SET seen = TRUE, seen_at = NOW()
                WHERE pair_id = $1
                  AND sequence <= $2
                  AND sender_id <> $3
                  AND seen = FALSE
                RETURNING id, pair_id, sequence, sender_id, sender_email, kind, payload,
                          created_at, seen, seen_at
            )
            SELECT * FROM updated ORDER BY sequence ASC
            "#,
        )
        .bind(pair_id.as_str())
        .bind(up_to)
        .bind(seen_by)
        .fetch_all(&self.pool)
        .await?;

        Ok(changed)
    }

    async fn list_page(&self, pair_id: &PairCode, after: i64, limit: i64) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, pair_id, sequence, sender_id, sender_email, kind, payload,
                   created_at, seen, seen_at
            FROM messages
            WHERE pair_id = $1 AND sequence > $2
            ORDER BY sequence ASC
            LIMIT $3
            "#,
        )
        .bind(pair_id.as_str())
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn latest_peer_sequence(
        &self,
        pair_id: &PairCode,
        requester: Uuid,
    ) -> Result<Option<i64>> {
        let latest: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(sequence)
            FROM messages
            WHERE pair_id = $1 AND sender_id <> $2
            "#,
        )
        .bind(pair_id.as_str())
        .bind(requester)
        .fetch_one(&self.pool)
        .await?;

        Ok(latest)
    }
}
