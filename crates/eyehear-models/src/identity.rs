//! Caller identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed guest identity used until a real auth system exists.
pub const GUEST_USER_ID: &str = "f3d98f8c-cf8d-40a3-b5c3-5c7cd5e2b52a";

/// Identity of the user submitting a video.
///
/// Injected into the orchestrator at construction rather than read
/// from a global, so a future session layer can supply real users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Create an identity from an existing user id.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self(user_id.into())
    }

    /// The fixed guest identity.
    pub fn guest() -> Self {
        Self(GUEST_USER_ID.to_string())
    }

    /// Get the inner user id.
    pub fn user_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
