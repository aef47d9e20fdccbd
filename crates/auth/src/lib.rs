//! Authentication for the Duet service
//!
//! Provides JWT validation and axum extractors that work with any domain
//! state implementing `FromRef<S>` for `AuthBackend`. The same backend is
//! used by the realtime gateway, which receives the token as a query
//! parameter rather than a header.

mod backend;
mod claims;
mod config;
mod context;
mod error;
mod extractors;
mod jwt;

pub use backend::AuthBackend;
pub use claims::DuetClaims;
pub use config::AuthConfig;
pub use context::AuthContext;
pub use error::AuthError;
pub use extractors::AuthUser;
pub use jwt::extract_bearer_token;
