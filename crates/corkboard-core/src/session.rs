//! Session handle supplied by the identity provider.
//!
//! The identity/session provider itself is an external collaborator; this
//! layer only needs the current user id to scope remote namespaces. Remote
//! backend constructors fail with [`StoreError::NotAuthenticated`] when the
//! session carries no user.

use crate::error::{Result, StoreError};

/// The authentication state of the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: Option<String>,
}

impl Session {
    /// A session for a signed-in user.
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// A session with no signed-in user.
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// The current user id, or `NotAuthenticated`.
    pub fn user_id(&self) -> Result<&str> {
        self.user_id
            .as_deref()
            .ok_or(StoreError::NotAuthenticated)
    }
}
