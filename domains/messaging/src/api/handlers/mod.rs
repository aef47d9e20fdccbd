//! HTTP and WebSocket handlers for the Messaging domain

pub mod messages;
pub mod socket;
