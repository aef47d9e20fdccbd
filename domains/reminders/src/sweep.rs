//! Timer-driven reminder sweep
//!
//! Each tick looks for reminders that came due since the last durable
//! watermark, pushes a `reminder_alert` to every live connection of the
//! reminder's pair, then advances the watermark. A reminder is alerted once
//! even across restarts. Every pair is resolved before the first alert goes
//! out, so a failed tick has pushed nothing and the next tick retries the
//! same window.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use duet_messaging::{ConnectionRegistry, PairDirectory, ServerEvent};

use crate::domain::errors::SweepError;
use crate::repository::{ReminderSource, WatermarkStore};

/// Watermark key for the reminder alert sweep
pub const REMINDER_ALERT_SWEEP: &str = "reminder_alerts";

#[derive(Clone)]
pub struct ReminderSweep {
    source: Arc<dyn ReminderSource>,
    watermarks: Arc<dyn WatermarkStore>,
    pairs: Arc<dyn PairDirectory>,
    registry: ConnectionRegistry,
    interval: Duration,
}

impl ReminderSweep {
    pub fn new(
        source: Arc<dyn ReminderSource>,
        watermarks: Arc<dyn WatermarkStore>,
        pairs: Arc<dyn PairDirectory>,
        registry: ConnectionRegistry,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            watermarks,
            pairs,
            registry,
            interval,
        }
    }

    /// Run one sweep ending at `now`. Returns the number of reminders alerted.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, SweepError> {
        let after = match self
            .watermarks
            .load(REMINDER_ALERT_SWEEP)
            .await
            .map_err(SweepError::Watermark)?
        {
            Some(mark) => mark,
            None => now - self.first_window(),
        };

        if after >= now {
            return Ok(0);
        }

        let due = self
            .source
            .due_between(after, now)
            .await
            .map_err(SweepError::Source)?;

        let mut targets = Vec::with_capacity(due.len());
        for reminder in &due {
            match self
                .pairs
                .find(&reminder.pair_id)
                .await
                .map_err(SweepError::Directory)?
            {
                Some(pair) => targets.push((reminder, pair)),
                None => tracing::warn!(
                    reminder_id = %reminder.id,
                    pair_id = %reminder.pair_id,
                    "Reminder references unknown pair"
                ),
            }
        }

        let mut alerted = 0;
        for (reminder, pair) in targets {
            let event = ServerEvent::ReminderAlert {
                reminder: reminder.alert_payload(),
            };
            let delivered = self.registry.broadcast(&pair, &event);
            alerted += 1;

            tracing::info!(
                reminder_id = %reminder.id,
                pair_id = %pair.id,
                delivered,
                "Reminder alert emitted"
            );
        }

        self.watermarks
            .save(REMINDER_ALERT_SWEEP, now)
            .await
            .map_err(SweepError::Watermark)?;

        Ok(alerted)
    }

    /// Tick until `shutdown` flips to true
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Reminder sweep started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.sweep_once(Utc::now()).await {
                        Ok(0) => {}
                        Ok(alerted) => tracing::debug!(alerted, "Reminder sweep finished"),
                        Err(e) => tracing::error!(error = %e, "Reminder sweep failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Reminder sweep stopped");
    }

    fn first_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.interval).unwrap_or_else(|_| chrono::Duration::minutes(1))
    }
}
