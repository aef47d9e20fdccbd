//! Pair directory backed by the `pairs` table
//!
//! Pairs are written by the pairing flow; this repository only reads them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duet_common::Result;
use sqlx::PgPool;
use uuid::Uuid;

use super::PairDirectory;
use crate::domain::entities::{Pair, PairCode, Participant};

#[derive(Clone)]
pub struct PgPairDirectory {
    pool: PgPool,
}

impl PgPairDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PairRow {
    id: PairCode,
    participant_a_id: Uuid,
    participant_a_name: String,
    participant_a_email: String,
    participant_b_id: Uuid,
    participant_b_name: String,
    participant_b_email: String,
    created_at: DateTime<Utc>,
}

impl From<PairRow> for Pair {
    fn from(row: PairRow) -> Self {
        Pair {
            id: row.id,
            participant_a: Participant::new(
                row.participant_a_id,
                row.participant_a_name,
                row.participant_a_email,
            ),
            participant_b: Participant::new(
                row.participant_b_id,
                row.participant_b_name,
                row.participant_b_email,
            ),
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl PairDirectory for PgPairDirectory {
    async fn find(&self, pair_id: &PairCode) -> Result<Option<Pair>> {
        let row = sqlx::query_as::<_, PairRow>(
            r#"
            SELECT id, participant_a_id, participant_a_name, participant_a_email,
                   participant_b_id, participant_b_name, participant_b_email,
                   created_at
            FROM pairs
            WHERE id = $1
            "#,
        )
        .bind(pair_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Pair::from))
    }
}
