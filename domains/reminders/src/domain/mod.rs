//! Reminders domain layer: entities and sweep errors

pub mod entities;
pub mod errors;
