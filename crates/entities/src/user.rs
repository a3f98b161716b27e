//! User-related entity definitions.

use serde::{Deserialize, Serialize};

/// A user, keyed by the identifier issued by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque identity from the authentication provider.
    pub uid: String,
    /// Email address reported by the provider.
    pub email: String,
}

impl User {
    /// Creates a new user.
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }
}
