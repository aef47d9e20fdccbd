//! Shared utilities, configuration, and error handling for Duet
//!
//! This crate provides common functionality used across the Duet service:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - State machine error type shared by domain state machines
//! - Request extractors (validated JSON, backfill cursor)

pub mod config;
pub mod error;
pub mod extractors;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use extractors::{BackfillQuery, ValidatedJson};
pub use state::StateError;
