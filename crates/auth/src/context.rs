//! Authenticated caller context

use uuid::Uuid;

/// Represents an authenticated participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub participant_id: Uuid,
    pub email: String,
    pub name: Option<String>,
}

impl AuthContext {
    pub fn new(participant_id: Uuid, email: String, name: Option<String>) -> Self {
        Self {
            participant_id,
            email,
            name,
        }
    }

    /// Name shown to the peer; falls back to the local part of the email
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => self.email.split('@').next().unwrap_or(&self.email),
        }
    }
}
