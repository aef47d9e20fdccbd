//! JWT claims types

use serde::{Deserialize, Serialize};

/// JWT claims issued by the external login service
#[derive(Debug, Serialize, Deserialize)]
pub struct DuetClaims {
    /// Subject (participant user ID)
    pub sub: String,
    /// Email, used as the sender identity on the wire
    pub email: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Issued at
    pub iat: u64,
    /// Expires at
    pub exp: u64,
    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}
