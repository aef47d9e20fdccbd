//! Messaging domain layer: entities, errors, wire protocol, session state

pub mod entities;
pub mod errors;
pub mod protocol;
pub mod state;
