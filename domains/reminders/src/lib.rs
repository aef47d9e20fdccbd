//! Reminders domain: due reminder sweep feeding realtime alerts

pub mod domain;
pub mod repository;
pub mod sweep;

pub use domain::entities::DueReminder;
pub use domain::errors::SweepError;
pub use repository::{
    InMemoryReminderSource, InMemoryWatermarkStore, PgReminderSource, PgWatermarkStore,
    ReminderSource, WatermarkStore,
};
pub use sweep::{ReminderSweep, REMINDER_ALERT_SWEEP};
