//! Sweep errors

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Failed to query due reminders: {0}")]
    Source(#[source] duet_common::Error),

    #[error("Failed to access sweep watermark: {0}")]
    Watermark(#[source] duet_common::Error),

    #[error("Failed to resolve pair: {0}")]
    Directory(#[source] duet_common::Error),
}
