//! API layer for the Messaging domain
//!
//! Contains HTTP handlers, the socket adapter, routes, and domain state.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::{MessagingSettings, MessagingState};
pub use routes::routes;
