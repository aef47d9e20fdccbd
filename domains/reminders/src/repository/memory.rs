//! In-memory reminder source and watermark store

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use duet_common::{Error, Result};
use uuid::Uuid;

use super::{ReminderSource, WatermarkStore};
use crate::domain::entities::DueReminder;

#[derive(Clone, Default)]
pub struct InMemoryReminderSource {
    reminders: Arc<DashMap<Uuid, DueReminder>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryReminderSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a reminder
    pub fn upsert(&self, reminder: DueReminder) {
        self.reminders.insert(reminder.id, reminder);
    }

    /// Simulate a storage outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReminderSource for InMemoryReminderSource {
    async fn due_between(
        &self,
        after: DateTime<Utc>,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<DueReminder>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Unavailable("Reminder source unavailable".to_string()));
        }

        let mut due: Vec<DueReminder> = self
            .reminders
            .iter()
            .filter(|entry| entry.value().is_due_within(after, up_to))
            .map(|entry| entry.value().clone())
            .collect();
        due.sort_by_key(|r| r.due_at);

        Ok(due)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryWatermarkStore {
    marks: Arc<DashMap<String, DateTime<Utc>>>,
}

impl InMemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WatermarkStore for InMemoryWatermarkStore {
    async fn load(&self, sweep: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.marks.get(sweep).map(|entry| *entry.value()))
    }

    async fn save(&self, sweep: &str, checked_at: DateTime<Utc>) -> Result<()> {
        self.marks.insert(sweep.to_string(), checked_at);
        Ok(())
    }
}
