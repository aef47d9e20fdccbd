//! Repository implementations for the Reminders domain

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duet_common::Result;

use crate::domain::entities::DueReminder;

pub use memory::{InMemoryReminderSource, InMemoryWatermarkStore};
pub use postgres::{PgReminderSource, PgWatermarkStore};

/// Read access to reminders owned by the reminder CRUD service
#[async_trait]
pub trait ReminderSource: Send + Sync {
    /// Incomplete reminders due in `(after, up_to]`, ordered by due time
    async fn due_between(
        &self,
        after: DateTime<Utc>,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<DueReminder>>;
}

/// Durable "last checked" marker per sweep
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn load(&self, sweep: &str) -> Result<Option<DateTime<Utc>>>;
    async fn save(&self, sweep: &str, checked_at: DateTime<Utc>) -> Result<()>;
}
