//! Postgres-backed reminder source and watermark store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duet_common::Result;
use sqlx::PgPool;

use super::{ReminderSource, WatermarkStore};
use crate::domain::entities::DueReminder;

#[derive(Clone)]
pub struct PgReminderSource {
    pool: PgPool,
}

impl PgReminderSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderSource for PgReminderSource {
    async fn due_between(
        &self,
        after: DateTime<Utc>,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<DueReminder>> {
        let reminders = sqlx::query_as::<_, DueReminder>(
            r#"
            SELECT id, pair_id, title, description, due_at, priority, completed
            FROM reminders
            WHERE completed = FALSE
              AND due_at > $1
              AND due_at <= $2
            ORDER BY due_at ASC
            "#,
        )
        .bind(after)
        .bind(up_to)
        .fetch_all(&self.pool)
        .await?;

        Ok(reminders)
    }
}

#[derive(Clone)]
pub struct PgWatermarkStore {
    pool: PgPool,
}

impl PgWatermarkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatermarkStore for PgWatermarkStore {
    async fn load(&self, sweep: &str) -> Result<Option<DateTime<Utc>>> {
        let checked_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT last_checked_at
            FROM sweep_watermarks
            WHERE sweep = $1
            "#,
        )
        .bind(sweep)
        .fetch_optional(&self.pool)
        .await?;

        Ok(checked_at)
    }

    async fn save(&self, sweep: &str, checked_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sweep_watermarks (sweep, last_checked_at)
            VALUES ($1, $2)
            ON CONFLICT (sweep) DO UPDATE SET last_checked_at = EXCLUDED.last_checked_at
            "#,
        )
        .bind(sweep)
        .bind(checked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
