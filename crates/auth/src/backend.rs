//! Concrete authentication backend
//!
//! Tokens are minted by the external login service; this backend only
//! validates them and turns the claims into an `AuthContext`.

use uuid::Uuid;

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::error::AuthError;

/// Concrete authentication backend.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthBackend {
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Validate a bearer/capability token and build the caller's context.
    ///
    /// The token is passed explicitly on every call; nothing is cached
    /// between requests.
    pub fn authenticate_token(&self, token: &str) -> Result<AuthContext, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingAuthorization);
        }

        let claims = crate::jwt::validate_jwt_token(token, &self.config)?;

        let participant_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;
        let email = claims
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or(AuthError::MissingEmail)?;

        Ok(AuthContext::new(participant_id, email, claims.name))
    }
}
