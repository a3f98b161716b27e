//! Signed-in user identity.
//!
//! Authentication happens elsewhere; this module only carries the resulting
//! `(uid, email)` pair to the services.

use std::sync::{PoisonError, RwLock};

use crate::error::{AppError, AppResult};

/// Identity handed over by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }
}

/// Source of the currently signed-in user.
pub trait IdentityProvider: Send + Sync {
    /// Returns the signed-in user, if any.
    fn current(&self) -> Option<Identity>;

    /// Returns the signed-in user or [`AppError::Unauthenticated`].
    fn require(&self) -> AppResult<Identity> {
        self.current().ok_or(AppError::Unauthenticated)
    }
}

/// A fixed identity (daemon, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<Identity>);

impl StaticIdentity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self(Some(Identity::new(uid, email)))
    }

    /// An identity that is never signed in.
    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// Identity that follows sign-in and sign-out.
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<Identity>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, identity: Identity) {
        tracing::info!(uid = %identity.uid, "Signed in");
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    pub fn sign_out(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(identity) = previous {
            tracing::info!(uid = %identity.uid, "Signed out");
        }
    }
}

impl IdentityProvider for SessionIdentity {
    fn current(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_sign_in_and_out() {
        let session = SessionIdentity::new();
        assert!(matches!(session.require(), Err(AppError::Unauthenticated)));

        session.sign_in(Identity::new("uid-1", "a@example.com"));
        assert_eq!(session.require().unwrap().uid, "uid-1");

        session.sign_out();
        assert!(session.current().is_none());
    }

    #[test]
    fn test_static_identity() {
        assert_eq!(
            StaticIdentity::new("uid-2", "b@example.com").current(),
            Some(Identity::new("uid-2", "b@example.com"))
        );
        assert!(StaticIdentity::anonymous().current().is_none());
    }

    #[test]
    fn test_unauthenticated_message_is_user_facing() {
        assert_eq!(AppError::Unauthenticated.to_string(), "You need to sign in first");
    }
}
