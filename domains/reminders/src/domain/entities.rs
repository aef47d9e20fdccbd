//! Domain entities for the Reminders domain
//!
//! Reminders are created and edited by the reminder CRUD service. The sweep
//! only reads them and turns the ones that come due into alerts.

use chrono::{DateTime, Utc};
use duet_messaging::PairCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// A reminder as seen by the sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DueReminder {
    pub id: Uuid,
    pub pair_id: PairCode,
    pub title: String,
    pub description: String,
    pub due_at: DateTime<Utc>,
    pub priority: String,
    pub completed: bool,
}

impl DueReminder {
    /// Whether the reminder falls in the half-open window `(after, up_to]`
    pub fn is_due_within(&self, after: DateTime<Utc>, up_to: DateTime<Utc>) -> bool {
        !self.completed && self.due_at > after && self.due_at <= up_to
    }

    /// Body of the `reminder_alert` event
    pub fn alert_payload(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "title": self.title,
            "description": self.description,
            "due_at": self.due_at,
            "time": self.due_at.format("%H:%M").to_string(),
            "priority": self.priority,
        })
    }
}
